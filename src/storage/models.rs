/// rental_partners 表中的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerRecord {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub is_active: bool,
}

/// partner_configurations 表中的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerConfigurationRecord {
    pub partner_id: String,
    pub config_key: String,
    pub config_value: String,
}

impl PartnerConfigurationRecord {
    pub fn new(partner_id: &str, key: &str, value: &str) -> Self {
        Self {
            partner_id: partner_id.to_string(),
            config_key: key.to_string(),
            config_value: value.to_string(),
        }
    }
}
