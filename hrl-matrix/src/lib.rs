pub mod design;
pub mod generate;
pub mod results;
pub mod row;

pub use design::DesignReader;
pub use generate::{full_factorial, write_design, Factor};
pub use results::ResultWriter;
pub use row::{validate_headers, Row};
