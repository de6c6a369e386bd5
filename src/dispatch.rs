//! Wrapping a function so real calls are recorded and can be replayed.

use std::fmt::Display;
use std::sync::Arc;

use crate::consumer::{Consumer, ReplayTarget, Replayed};
use crate::error::{ReplayError, SerializeError};
use crate::globals::{snapshot_globals, Context};
use crate::inputs::Inputs;
use crate::producer::Producer;
use crate::queue::ProduceQueue;
use crate::value::{Capture, Restore, Value};

type TargetFn<A, O, E, C> = dyn Fn(&C, A) -> Result<O, E> + Send + Sync;

/// A monitored function together with its name.
pub struct Target<A, O, E, C> {
    name: String,
    func: Arc<TargetFn<A, O, E, C>>,
}

impl<A, O, E, C> Target<A, O, E, C> {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&C, A) -> Result<O, E> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, context: &C, args: A) -> Result<O, E> {
        (self.func)(context, args)
    }
}

/// Capture a call outcome; errors are wrapped so they never equal a return value.
fn capture_outcome<O: Capture, E: Capture>(result: &Result<O, E>) -> Result<Value, SerializeError> {
    match result {
        Ok(output) => output.capture(),
        Err(err) => err.capture().map(Value::raised),
    }
}

impl<A, O, E, C> ReplayTarget for Target<A, O, E, C>
where
    A: Restore + 'static,
    O: Capture + 'static,
    E: Capture + Display + 'static,
    C: Context + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn replay(&self, inputs: &Inputs) -> Result<Replayed, ReplayError> {
        let args: A = inputs.bind()?;
        let context = C::restore_globals(&inputs.globals)?;
        let result = self.call(&context, args);
        let exception = result.as_ref().err().map(ToString::to_string);
        Ok(Replayed {
            output: capture_outcome(&result)?,
            exception,
        })
    }
}

/// A monitored function.
///
/// Calling it runs the wrapped function on the caller's thread and returns
/// its result untouched. When recording is enabled the arguments, context and
/// outcome are captured and the snap is submitted in the background.
///
/// # Example
/// ```no_run
/// use varsnap::Harness;
///
/// let add = Harness::global().varsnap(varsnap::qualname!(add), |(x, y): (i64, i64)| {
///     Ok::<_, String>(x + y)
/// });
/// assert_eq!(add.call((2, 3)), Ok(5));
/// ```
pub struct Varsnap<A, O, E, C = ()> {
    target: Arc<Target<A, O, E, C>>,
    producer: Arc<Producer>,
    consumer: Arc<Consumer>,
    queue: Arc<ProduceQueue>,
}

impl<A, O, E, C> Clone for Varsnap<A, O, E, C> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            producer: self.producer.clone(),
            consumer: self.consumer.clone(),
            queue: self.queue.clone(),
        }
    }
}

impl<A, O, E, C> Varsnap<A, O, E, C>
where
    A: Capture + Restore + 'static,
    O: Capture + 'static,
    E: Capture + Display + 'static,
    C: Context + 'static,
{
    pub(crate) fn new(
        target: Arc<Target<A, O, E, C>>,
        producer: Arc<Producer>,
        consumer: Arc<Consumer>,
        queue: Arc<ProduceQueue>,
    ) -> Self {
        Self {
            target,
            producer,
            consumer,
            queue,
        }
    }

    /// Call with an explicit context.
    pub fn call_with(&self, context: &C, args: A) -> Result<O, E> {
        let inputs = if self.producer.is_enabled() {
            match Inputs::capture(&args, snapshot_globals(context)) {
                Ok(inputs) => Some(inputs),
                Err(err) => {
                    tracing::debug!(signature = %self.producer.signature(), error = %err, "dropping snap with unrepresentable inputs");
                    None
                }
            }
        } else {
            None
        };

        let result = self.target.call(context, args);

        if let Some(inputs) = inputs {
            match capture_outcome(&result) {
                Ok(output) => {
                    let producer = self.producer.clone();
                    self.queue
                        .submit(async move { producer.produce(inputs, output).await });
                }
                Err(err) => {
                    tracing::debug!(signature = %self.producer.signature(), error = %err, "dropping snap with unrepresentable output");
                }
            }
        }
        result
    }

    /// Fully qualified name of the wrapped function.
    pub fn name(&self) -> &str {
        &self.target.name
    }

    /// The name without its module path.
    pub fn short_name(&self) -> &str {
        self.name().rsplit("::").next().unwrap_or_default()
    }

    pub fn producer(&self) -> &Arc<Producer> {
        &self.producer
    }

    pub fn consumer(&self) -> &Arc<Consumer> {
        &self.consumer
    }
}

impl<A, O, E> Varsnap<A, O, E, ()>
where
    A: Capture + Restore + 'static,
    O: Capture + 'static,
    E: Capture + Display + 'static,
{
    pub fn call(&self, args: A) -> Result<O, E> {
        self.call_with(&(), args)
    }
}

impl<A, O, E, C> std::fmt::Debug for Varsnap<A, O, E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Varsnap")
            .field("name", &self.target.name)
            .finish_non_exhaustive()
    }
}
