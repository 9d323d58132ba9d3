//! Rules that catch code which is likely broken

pub mod no_misleading_character_class;
pub mod no_undef;

pub use no_misleading_character_class::NoMisleadingCharacterClass;
pub use no_undef::NoUndef;
