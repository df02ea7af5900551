pub mod accessor;
pub mod error;
pub mod gateway;
pub mod oracle;
pub mod page;
pub mod renderer;

pub use accessor::{AccessorConfig, PageAccessor};
pub use error::{LoadError, OracleError, SetupError};
pub use gateway::{Classifier, ClassificationGateway, LINK_CONTEXT_LIMIT, PAGE_TEXT_LIMIT};
pub use oracle::{ChatOracle, Oracle, OracleConfig, Prompt, Task};
pub use page::{Anchor, LinkCandidate, PageSnapshot};
pub use renderer::{HttpRenderer, HttpSession, RenderSession, Renderer, RendererConfig};
