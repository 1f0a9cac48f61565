pub mod attribute;
pub mod condition;
pub mod conflict;
pub mod modifier;
pub mod pricebook;
pub mod product;
pub mod zone;

pub(crate) fn default_true() -> bool {
    true
}
