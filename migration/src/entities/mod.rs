pub mod error_log;
pub mod landing;
pub mod partner_configuration;
pub mod rental_click;
pub mod rental_partner;

pub use error_log::Entity as ErrorLogEntity;
pub use landing::Entity as LandingEntity;
pub use partner_configuration::Entity as PartnerConfigurationEntity;
pub use rental_click::Entity as RentalClickEntity;
pub use rental_partner::Entity as RentalPartnerEntity;
