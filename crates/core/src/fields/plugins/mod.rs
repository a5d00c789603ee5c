mod constant;
mod properties;
mod record_sfid;
mod related_ids;
mod related_term_string;
mod token;

pub use constant::ConstantPlugin;
pub use properties::PropertiesPlugin;
pub use record_sfid::RecordSfidPlugin;
pub use related_ids::RelatedIdsPlugin;
pub use related_term_string::RelatedTermStringPlugin;
pub use token::TokenPlugin;
