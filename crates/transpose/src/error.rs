//! Error types for stage transitions.

use thiserror::Error;

/// Result type for transition operations.
pub type Result<T> = std::result::Result<T, TransitionError>;

/// Errors that abort a render pass.
///
/// Everything else (a missing shared counterpart, an element without an exit
/// configuration, a route without leave handlers) is a normal state and is
/// handled by a fallback branch instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// An animated element was mounted without a live node handle.
    #[error("a transitioned element should provide a valid node handle (element '{element}' on route '{route}')")]
    MissingRef {
        /// Route the element was mounted under.
        route: String,
        /// Label given to the element by its route view.
        element: String,
    },

    /// No stage entry matches the requested stage.
    #[error("could not find element with stage '{0}'")]
    StageNotFound(String),

    /// The matched stage entry supplies neither a component nor a render function.
    #[error("please provide a component or render function for stage '{0}'")]
    MissingRenderer(String),

    /// Content asked for the stage setter but the switch group was built without one.
    #[error("stage setter is undefined; build the switch group with a stage setter")]
    MissingStageSetter,
}
