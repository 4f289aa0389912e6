//! Handler registry for dispatching invocations by operation name.
//!
//! Registration happens once, on a [`RegistryBuilder`], while the host starts.
//! [`RegistryBuilder::build`] freezes it into a [`HandlerRegistry`] that is
//! never mutated again and can be shared as `Arc<HandlerRegistry>`.
//!
//! # Example
//!
//! ```
//! use shellwire::handler::{InvocationContext, RegistryBuilder};
//! use shellwire::host::HostCapabilities;
//! use serde_json::json;
//!
//! # tokio_test_block_on(async {
//! let mut builder = RegistryBuilder::new();
//! builder
//!     .register("demo:add", |_ctx, (a, b): (i64, i64)| async move { Ok(a + b) })
//!     .unwrap();
//! let registry = builder.build();
//!
//! let ctx = InvocationContext::new(HostCapabilities::headless());
//! let sum = registry.invoke("demo:add", ctx, vec![json!(2), json!(3)]).await.unwrap();
//! assert_eq!(sum, json!(5));
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use serde::Serialize;
use serde_json::Value;

use super::InvocationContext;
use crate::error::{Result, ShellwireError};
use crate::operation::{Args, FromArgs, OperationName};
use crate::protocol::{RegistrySchema, PROTOCOL_VERSION};

/// Result type for handler functions.
pub type HandlerResult = Result<Value>;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for handler functions.
pub trait Handler: Send + Sync + 'static {
    /// Handle an invocation with raw positional arguments.
    fn call(&self, ctx: InvocationContext, args: Args) -> BoxFuture<'static, HandlerResult>;
}

/// Wrapper that decodes positional arguments before calling the handler and
/// converts its output into a [`Value`].
pub struct TypedHandler<F, A, R, Fut>
where
    F: Fn(InvocationContext, A) -> Fut + Send + Sync + 'static,
    A: FromArgs,
    R: Serialize + Send + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    handler: F,
    _phantom: PhantomData<fn(A) -> Fut>,
}

impl<F, A, R, Fut> TypedHandler<F, A, R, Fut>
where
    F: Fn(InvocationContext, A) -> Fut + Send + Sync + 'static,
    A: FromArgs,
    R: Serialize + Send + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    /// Create a new typed handler.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, A, R, Fut> Handler for TypedHandler<F, A, R, Fut>
where
    F: Fn(InvocationContext, A) -> Fut + Send + Sync + 'static,
    A: FromArgs,
    R: Serialize + Send + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    fn call(&self, ctx: InvocationContext, args: Args) -> BoxFuture<'static, HandlerResult> {
        let parsed = match A::from_args(args) {
            Ok(v) => v,
            Err(e) => return Box::pin(async move { Err(e) }),
        };

        let fut = (self.handler)(ctx, parsed);
        Box::pin(async move {
            let output = fut.await?;
            Ok(serde_json::to_value(output)?)
        })
    }
}

/// Mutable registry used while the host starts.
#[derive(Default)]
pub struct RegistryBuilder {
    operations: HashMap<String, (OperationName, Box<dyn Handler>)>,
    events: BTreeSet<OperationName>,
}

impl RegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a typed handler under `name` (`namespace:verb`).
    ///
    /// # Errors
    ///
    /// `InvalidOperationName` if `name` is malformed, `DuplicateRegistration`
    /// if it is already taken.
    pub fn register<F, A, R, Fut>(&mut self, name: &str, handler: F) -> Result<&mut Self>
    where
        F: Fn(InvocationContext, A) -> Fut + Send + Sync + 'static,
        A: FromArgs,
        R: Serialize + Send + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        self.register_handler(name.parse()?, Box::new(TypedHandler::new(handler)))
    }

    /// Register an already boxed handler.
    pub fn register_handler(
        &mut self,
        name: OperationName,
        handler: Box<dyn Handler>,
    ) -> Result<&mut Self> {
        if self.operations.contains_key(name.as_str()) {
            return Err(ShellwireError::DuplicateRegistration(name.to_string()));
        }
        self.operations
            .insert(name.as_str().to_string(), (name, handler));
        Ok(self)
    }

    /// Declare an event that handlers may emit; it is advertised in the schema.
    pub fn declare_event(&mut self, name: &str) -> Result<&mut Self> {
        let name: OperationName = name.parse()?;
        if !self.events.insert(name.clone()) {
            return Err(ShellwireError::DuplicateRegistration(name.to_string()));
        }
        Ok(self)
    }

    /// Whether `name` is already registered.
    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Freeze the registry.
    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            operations: self.operations,
            events: self.events.into_iter().collect(),
        }
    }
}

/// Immutable mapping from operation name to handler.
pub struct HandlerRegistry {
    operations: HashMap<String, (OperationName, Box<dyn Handler>)>,
    events: Vec<OperationName>,
}

impl HandlerRegistry {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Whether a handler is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Number of registered operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether no operation is registered.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Registered operation names, sorted.
    pub fn operations(&self) -> Vec<&OperationName> {
        let mut names: Vec<_> = self.operations.values().map(|(name, _)| name).collect();
        names.sort();
        names
    }

    /// Declared event names, sorted.
    pub fn events(&self) -> &[OperationName] {
        &self.events
    }

    /// Schema announced to renderers on connect.
    pub fn schema(&self) -> RegistrySchema {
        RegistrySchema {
            version: PROTOCOL_VERSION.to_string(),
            operations: self.operations().into_iter().cloned().collect(),
            events: self.events.clone(),
        }
    }

    /// Invoke the handler registered under `name`.
    ///
    /// # Errors
    ///
    /// - `HostTerminated` once the context's lifecycle is terminated; no handler runs
    /// - `OperationNotFound` if nothing is registered under `name`
    /// - `InvalidArguments` if `args` do not fit the handler
    /// - `HandlerFailure` wrapping whatever the handler returned
    pub async fn invoke(&self, name: &str, ctx: InvocationContext, args: Args) -> Result<Value> {
        if ctx.lifecycle().is_terminated() {
            tracing::debug!("Refusing {} (request {}): host terminated", name, ctx.request_id());
            return Err(ShellwireError::HostTerminated);
        }

        let (_, handler) = match self.operations.get(name) {
            Some(entry) => entry,
            None => {
                tracing::warn!("Unknown operation {} (request {})", name, ctx.request_id());
                return Err(ShellwireError::OperationNotFound(name.to_string()));
            }
        };

        tracing::debug!("Invoking {} (request {})", name, ctx.request_id());

        match handler.call(ctx, args).await {
            Ok(value) => Ok(value),
            Err(e @ ShellwireError::InvalidArguments(_)) => {
                tracing::warn!("Rejected arguments for {}: {}", name, e);
                Err(e)
            }
            Err(e) => {
                tracing::error!("Handler error for {}: {}", name, e);
                Err(ShellwireError::HandlerFailure {
                    operation: name.to_string(),
                    source: Box::new(e),
                })
            }
        }
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("operations", &self.operations())
            .field("events", &self.events)
            .finish()
    }
}
