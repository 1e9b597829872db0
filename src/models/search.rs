use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// 地点类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    Airport,
    City,
    #[default]
    Location,
    #[serde(other)]
    Other,
}

/// 可租车地点（自动补全结果或访客定位）
///
/// 所有文本字段缺省为空字符串，空串在各解析规则中一律视为"缺失"。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RentalLocation {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    /// IATA 或合作方内部代码
    #[serde(default)]
    pub code: String,
    #[serde(default, rename = "type")]
    pub location_type: LocationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() { None } else { Some(s) }
}

impl RentalLocation {
    pub fn airport<S: Into<String>>(code: S, name: S) -> Self {
        let code = code.into();
        let name = name.into();
        Self {
            id: code.to_lowercase(),
            display_name: name.clone(),
            name,
            code,
            location_type: LocationType::Airport,
            ..Default::default()
        }
    }

    pub fn is_airport(&self) -> bool {
        self.location_type == LocationType::Airport
    }

    /// 机场且有代码时返回代码
    pub fn airport_code(&self) -> Option<&str> {
        if self.is_airport() {
            non_empty(&self.code)
        } else {
            None
        }
    }

    /// displayName，其次 name
    pub fn label(&self) -> Option<&str> {
        non_empty(&self.display_name).or_else(|| non_empty(&self.name))
    }

    /// code，其次 id
    pub fn code_or_id(&self) -> Option<&str> {
        non_empty(&self.code).or_else(|| non_empty(&self.id))
    }

    pub fn code(&self) -> Option<&str> {
        non_empty(&self.code)
    }

    pub fn id(&self) -> Option<&str> {
        non_empty(&self.id)
    }

    pub fn country(&self) -> Option<&str> {
        non_empty(&self.country)
    }
}

/// 一次租车搜索
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    /// 取车地点（访客输入的文本）
    pub pickup: String,
    /// 还车地点文本，同地还车时与 pickup 相同
    #[serde(default)]
    pub dropoff: String,
    pub pickup_date: NaiveDate,
    pub dropoff_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub pickup_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub dropoff_time: NaiveTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_location: Option<RentalLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropoff_location: Option<RentalLocation>,
}

impl SearchParams {
    /// 同地还车的搜索
    pub fn round_trip(
        pickup: impl Into<String>,
        pickup_date: NaiveDate,
        pickup_time: NaiveTime,
        dropoff_date: NaiveDate,
        dropoff_time: NaiveTime,
    ) -> Self {
        let pickup = pickup.into();
        Self {
            dropoff: pickup.clone(),
            pickup,
            pickup_date,
            dropoff_date,
            pickup_time,
            dropoff_time,
            pickup_location: None,
            dropoff_location: None,
        }
    }

    pub fn with_pickup_location(mut self, location: RentalLocation) -> Self {
        self.pickup_location = Some(location);
        self
    }

    pub fn with_dropoff(mut self, dropoff: impl Into<String>) -> Self {
        self.dropoff = dropoff.into();
        self
    }

    pub fn with_dropoff_location(mut self, location: RentalLocation) -> Self {
        self.dropoff_location = Some(location);
        self
    }

    /// 搜索自带的取车地点优先，否则用调用方给的地点
    pub fn effective_pickup<'a>(&'a self, location: &'a RentalLocation) -> &'a RentalLocation {
        self.pickup_location.as_ref().unwrap_or(location)
    }

    /// 访客是否在还车框里输入了不同于取车的文本
    pub fn has_typed_dropoff(&self) -> bool {
        self.dropoff != self.pickup
    }

    pub fn pickup_date_str(&self) -> String {
        self.pickup_date.format("%Y-%m-%d").to_string()
    }

    pub fn dropoff_date_str(&self) -> String {
        self.dropoff_date.format("%Y-%m-%d").to_string()
    }

    pub fn pickup_time_str(&self) -> String {
        hhmm::format(&self.pickup_time)
    }

    pub fn dropoff_time_str(&self) -> String {
        hhmm::format(&self.dropoff_time)
    }
}

/// `HH:MM` 时间格式（兼容带秒的输入）
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(time: &NaiveTime) -> String {
        time.format("%H:%M").to_string()
    }

    pub fn parse(s: &str) -> Option<NaiveTime> {
        let s = s.trim();
        NaiveTime::parse_from_str(s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .ok()
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid time '{}'", raw)))
    }
}
