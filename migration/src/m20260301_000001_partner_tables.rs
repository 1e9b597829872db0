//! 合作方表迁移
//!
//! 创建 rental_partners 与 partner_configurations 两张表，
//! 并写入三个规范合作方（kayak / skyscanner / autorentals）的初始配置。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RentalPartners::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RentalPartners::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RentalPartners::Name).string_len(64).not_null())
                    .col(
                        ColumnDef::new(RentalPartners::DisplayName)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RentalPartners::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(RentalPartners::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PartnerConfigurations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PartnerConfigurations::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PartnerConfigurations::PartnerId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PartnerConfigurations::ConfigKey)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PartnerConfigurations::ConfigValue)
                            .text()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_partner_configurations_partner")
                    .table(PartnerConfigurations::Table)
                    .col(PartnerConfigurations::PartnerId)
                    .to_owned(),
            )
            .await?;

        // 初始数据与后备配置保持一致
        let seed_partners = [
            ("autorentals", "autorentals", "AutoRentals"),
            ("kayak", "kayak", "Kayak"),
            ("skyscanner", "skyscanner", "Skyscanner"),
        ];
        for (id, name, display_name) in seed_partners {
            let insert = Query::insert()
                .into_table(RentalPartners::Table)
                .columns([
                    RentalPartners::Id,
                    RentalPartners::Name,
                    RentalPartners::DisplayName,
                    RentalPartners::IsActive,
                    RentalPartners::CreatedAt,
                ])
                .values_panic([
                    id.into(),
                    name.into(),
                    display_name.into(),
                    true.into(),
                    Expr::current_timestamp().into(),
                ])
                .to_owned();
            manager.exec_stmt(insert).await?;
        }

        let seed_configs = [
            ("autorentals", "campaign_id", "11001"),
            ("autorentals", "tracking_param", "21207214"),
            ("autorentals", "utm_source", "rental-discounts"),
            ("autorentals", "utm_medium", "widget"),
            ("skyscanner", "mediaPartnerId", "3495464"),
            ("skyscanner", "utm_term", "21207558"),
            ("skyscanner", "utm_source", "rental-discounts"),
            ("skyscanner", "utm_medium", "affiliate"),
            ("kayak", "affiliateId", "rental-discounts"),
            ("kayak", "utm_source", "rental-discounts"),
            ("kayak", "utm_medium", "affiliate"),
        ];
        for (partner_id, key, value) in seed_configs {
            let insert = Query::insert()
                .into_table(PartnerConfigurations::Table)
                .columns([
                    PartnerConfigurations::PartnerId,
                    PartnerConfigurations::ConfigKey,
                    PartnerConfigurations::ConfigValue,
                ])
                .values_panic([partner_id.into(), key.into(), value.into()])
                .to_owned();
            manager.exec_stmt(insert).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_partner_configurations_partner")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(PartnerConfigurations::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(RentalPartners::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum RentalPartners {
    #[sea_orm(iden = "rental_partners")]
    Table,
    Id,
    Name,
    DisplayName,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PartnerConfigurations {
    #[sea_orm(iden = "partner_configurations")]
    Table,
    Id,
    PartnerId,
    ConfigKey,
    ConfigValue,
}
