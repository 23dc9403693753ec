pub(crate) mod health;
pub(crate) mod lookup;
pub(crate) mod portfolio;
