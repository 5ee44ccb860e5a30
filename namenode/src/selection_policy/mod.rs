pub mod random_selection_policy;
pub mod selection_policy;
