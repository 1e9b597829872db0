//! `rentroute link`：离线生成合作方深链

use chrono::{NaiveDate, NaiveTime};
use colored::Colorize;

use crate::cli::LocationKindArg;
use crate::interfaces::cli::CliError;
use crate::models::{LocationType, RentalLocation, SearchParams};
use crate::partners::{Partner, PartnerKind, fallback_config};

pub struct LinkArgs {
    pub partner: String,
    pub pickup: String,
    pub pickup_date: NaiveDate,
    pub pickup_time: NaiveTime,
    pub dropoff_date: NaiveDate,
    pub dropoff_time: NaiveTime,
    pub dropoff: Option<String>,
    pub code: Option<String>,
    pub location_id: Option<String>,
    pub location_type: LocationKindArg,
    pub click_id: Option<String>,
}

impl From<LocationKindArg> for LocationType {
    fn from(kind: LocationKindArg) -> Self {
        match kind {
            LocationKindArg::Airport => LocationType::Airport,
            LocationKindArg::City => LocationType::City,
            LocationKindArg::Location => LocationType::Location,
        }
    }
}

/// 用内置合作方配置生成深链（不访问数据库）
pub fn build_deep_link(args: &LinkArgs) -> Result<String, CliError> {
    let kind: PartnerKind = args
        .partner
        .trim()
        .parse()
        .map_err(|_| CliError::ParseError(format!("Unknown partner '{}'", args.partner)))?;
    let partner = Partner::from_config(fallback_config(kind)).ok_or_else(|| {
        CliError::CommandError(format!("Partner {} not available", args.partner))
    })?;

    let mut params = SearchParams::round_trip(
        args.pickup.clone(),
        args.pickup_date,
        args.pickup_time,
        args.dropoff_date,
        args.dropoff_time,
    );
    if let Some(dropoff) = args.dropoff.as_deref().filter(|d| !d.trim().is_empty()) {
        params = params.with_dropoff(dropoff);
    }

    let code = args.code.clone().unwrap_or_default();
    let location = RentalLocation {
        id: args
            .location_id
            .clone()
            .unwrap_or_else(|| code.to_lowercase()),
        name: args.pickup.clone(),
        display_name: args.pickup.clone(),
        code,
        location_type: args.location_type.into(),
        ..Default::default()
    };

    Ok(partner.generate_deep_link(&params, &location, args.click_id.as_deref()))
}

pub fn print_deep_link(args: &LinkArgs) -> Result<(), CliError> {
    let url = build_deep_link(args)?;
    println!("{} {}", "Deep link:".green().bold(), url);
    Ok(())
}
