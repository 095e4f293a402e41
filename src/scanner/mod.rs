pub mod types;
pub mod offsets;
pub mod syntax;
pub mod links;
pub mod phone;
pub mod text_link;
pub mod resolver;
pub mod lookup;
pub mod change;
pub mod document;
pub mod style;

pub use types::*;
pub use offsets::*;
pub use syntax::*;
pub use links::*;
pub use phone::*;
pub use text_link::*;
pub use resolver::*;
pub use lookup::*;
pub use change::*;
pub use document::*;
pub use style::*;
