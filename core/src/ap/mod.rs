//! Collection of APs that corresponds with DF (Dedicated File) in the card

pub mod jpki;
pub mod support;

pub use self::jpki::JpkiAp;
pub use self::support::SupportAp;
