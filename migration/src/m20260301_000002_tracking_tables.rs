//! 追踪表迁移
//!
//! 创建 rental_clicks、landings、error_logs 三张表：
//! - rental_clicks: 每次跳转合作方时的点击记录
//! - landings: 访客会话入口记录
//! - error_logs: 前端/管线错误日志

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RentalClicks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RentalClicks::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RentalClicks::ClickId).string_len(64).not_null())
                    .col(ColumnDef::new(RentalClicks::LandingId).string_len(64).null())
                    .col(ColumnDef::new(RentalClicks::Partner).string_len(64).not_null())
                    .col(ColumnDef::new(RentalClicks::IataCode).string_len(64).null())
                    .col(ColumnDef::new(RentalClicks::LocationId).string_len(255).null())
                    .col(
                        ColumnDef::new(RentalClicks::PickupDateNew)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RentalClicks::PickupTimeNew)
                            .string_len(5)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RentalClicks::DropoffDateNew)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RentalClicks::DropoffTimeNew)
                            .string_len(5)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RentalClicks::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RentalClicks::Placement).string_len(16).not_null())
                    .col(ColumnDef::new(RentalClicks::RedirectUrl).text().not_null())
                    .col(ColumnDef::new(RentalClicks::SearchParams).text().not_null())
                    .col(
                        ColumnDef::new(RentalClicks::AutoParams)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_rental_clicks_landing")
                    .table(RentalClicks::Table)
                    .col(RentalClicks::LandingId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Landings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Landings::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Landings::LandingId).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Landings::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Landings::UrlParams).text().not_null())
                    .col(ColumnDef::new(Landings::Metadata).text().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_landings_landing_id")
                    .table(Landings::Table)
                    .col(Landings::LandingId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ErrorLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ErrorLogs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ErrorLogs::ErrorId).string_len(64).not_null())
                    .col(
                        ColumnDef::new(ErrorLogs::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ErrorLogs::ErrorType).string_len(32).not_null())
                    .col(ColumnDef::new(ErrorLogs::Title).string_len(255).not_null())
                    .col(ColumnDef::new(ErrorLogs::Message).text().not_null())
                    .col(ColumnDef::new(ErrorLogs::Stack).text().null())
                    .col(ColumnDef::new(ErrorLogs::UserContext).text().not_null())
                    .col(ColumnDef::new(ErrorLogs::ErrorContext).text().not_null())
                    .col(ColumnDef::new(ErrorLogs::Severity).string_len(16).not_null())
                    .col(
                        ColumnDef::new(ErrorLogs::Resolved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(ErrorLogs::Metadata).text().not_null())
                    .to_owned(),
            )
            .await?;

        // 按时间范围统计错误
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_error_logs_timestamp")
                    .table(ErrorLogs::Table)
                    .col(ErrorLogs::Timestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_error_logs_timestamp").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ErrorLogs::Table).to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_landings_landing_id").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Landings::Table).to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_rental_clicks_landing").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RentalClicks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum RentalClicks {
    #[sea_orm(iden = "rental_clicks")]
    Table,
    Id,
    ClickId,
    LandingId,
    Partner,
    IataCode,
    LocationId,
    PickupDateNew,
    PickupTimeNew,
    DropoffDateNew,
    DropoffTimeNew,
    Timestamp,
    Placement,
    RedirectUrl,
    SearchParams,
    AutoParams,
}

#[derive(DeriveIden)]
enum Landings {
    #[sea_orm(iden = "landings")]
    Table,
    Id,
    LandingId,
    Timestamp,
    UrlParams,
    Metadata,
}

#[derive(DeriveIden)]
enum ErrorLogs {
    #[sea_orm(iden = "error_logs")]
    Table,
    Id,
    ErrorId,
    Timestamp,
    ErrorType,
    Title,
    Message,
    Stack,
    UserContext,
    ErrorContext,
    Severity,
    Resolved,
    Metadata,
}
