//! Handler module - operation registration and dispatch.
//!
//! Provides:
//! - [`RegistryBuilder`] / [`HandlerRegistry`] - maps operation names to handlers
//! - [`InvocationContext`] - what a handler may touch during one call
//!
//! # Example
//!
//! ```
//! use shellwire::handler::{HandlerRegistry, InvocationContext};
//! use shellwire::Result;
//!
//! async fn minimize_all(ctx: InvocationContext, _: ()) -> Result<()> {
//!     let windows = ctx.capabilities().windows();
//!     for window in windows.windows() {
//!         windows.minimize(window)?;
//!     }
//!     Ok(())
//! }
//!
//! let mut builder = HandlerRegistry::builder();
//! builder.register("ui:handleMinimizeApp", minimize_all).unwrap();
//! let registry = builder.build();
//! assert!(registry.contains("ui:handleMinimizeApp"));
//! ```

mod context;
mod registry;

pub use context::InvocationContext;
pub use registry::{BoxFuture, Handler, HandlerRegistry, HandlerResult, RegistryBuilder, TypedHandler};
