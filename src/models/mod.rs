//! 领域数据模型
//!
//! - `search`: 搜索参数与地点
//! - `partner`: 合作方配置
//! - `tracking`: 点击 / 落地记录与访客上下文

mod partner;
mod search;
mod tracking;

pub use partner::PartnerConfig;
pub use search::{LocationType, RentalLocation, SearchParams, hhmm};
pub use tracking::{
    ClickTrackingData, DeviceType, GeoPoint, LandingData, LandingMetadata, PartnerVisit,
    Placement, VisitContext,
};
