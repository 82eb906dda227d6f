pub mod dashboard;
pub mod energy_csv;
pub mod feedback;
pub mod inference;
pub mod visitor;
