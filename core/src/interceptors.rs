//! Interceptor hooks along the request pipeline.
//!
//! Interceptors observe and/or modify state at named hooks per attempt.
//! Read hooks MUST NOT mutate observable state; modify hooks take the
//! current value and return the replacement. Hooks fire in the documented
//! pipeline order and modifications from earlier hooks are visible to
//! later ones.

use tracing::debug;

use crate::ClientError;
use crate::transport::{Request, Response};
use crate::types::TypedProperties;
use crate::Ref;

/// Context available before serialization.
pub struct InputContext<'c, I> {
    /// The modeled request for the operation being invoked.
    pub request: &'c I,
    /// The typed context property bag.
    pub properties: &'c mut TypedProperties,
}

/// Context available once a transport request exists.
pub struct RequestContext<'c, I> {
    pub request: &'c I,
    /// The transmittable request for the operation being invoked.
    pub transport_request: &'c Request,
    pub properties: &'c mut TypedProperties,
}

/// Context available once a transport response exists.
pub struct ResponseContext<'c, I> {
    pub request: &'c I,
    pub transport_request: &'c Request,
    /// The transmitted response for the operation being invoked.
    pub transport_response: &'c Response,
    pub properties: &'c mut TypedProperties,
}

/// Context available once an attempt or execution has produced an outcome.
pub struct OutputContext<'c, I, O> {
    /// The modeled request. Absent only when a modify hook consumed the
    /// request and then failed before returning a replacement.
    pub request: Option<&'c I>,
    pub transport_request: Option<&'c Request>,
    pub transport_response: Option<&'c Response>,
    /// The modeled response or the error that took its place.
    pub response: &'c Result<O, ClientError>,
    pub properties: &'c mut TypedProperties,
}

/// Allows injecting code into the request execution pipeline.
///
/// Terminology:
///
/// * execution - one end-to-end invocation against a client.
/// * attempt - one try at performing an execution. Executions are retried
///   based on the client's retry strategy.
/// * hook - a single method on the interceptor. Hooks are either "read"
///   hooks, which make it possible to observe in-flight messages, or
///   "modify" hooks, which return a replacement for an in-flight value.
#[allow(unused_variables)]
pub trait Interceptor<I, O>: Send + Sync {
    /// Called at the start of an execution, before anything else.
    ///
    /// Errors from this hook are latched until every interceptor has run
    /// it; the pipeline then jumps to the completion hooks with the last
    /// error as the response.
    fn read_before_execution(&self, context: &mut InputContext<'_, I>) -> Result<(), ClientError> {
        Ok(())
    }

    /// Called before the modeled request is serialized. May replace it.
    fn modify_before_serialization(
        &self,
        request: I,
        properties: &mut TypedProperties,
    ) -> Result<I, ClientError> {
        Ok(request)
    }

    fn read_before_serialization(
        &self,
        context: &mut InputContext<'_, I>,
    ) -> Result<(), ClientError> {
        Ok(())
    }

    fn read_after_serialization(
        &self,
        context: &mut RequestContext<'_, I>,
    ) -> Result<(), ClientError> {
        Ok(())
    }

    /// Called once before the retry loop is entered. May replace the
    /// transport request.
    fn modify_before_retry_loop(
        &self,
        request: Request,
        properties: &mut TypedProperties,
    ) -> Result<Request, ClientError> {
        Ok(request)
    }

    /// Called before each attempt. Errors are latched like
    /// [`Interceptor::read_before_execution`], jumping to attempt
    /// completion.
    fn read_before_attempt(&self, context: &mut RequestContext<'_, I>) -> Result<(), ClientError> {
        Ok(())
    }

    fn modify_before_signing(
        &self,
        request: Request,
        properties: &mut TypedProperties,
    ) -> Result<Request, ClientError> {
        Ok(request)
    }

    fn read_before_signing(&self, context: &mut RequestContext<'_, I>) -> Result<(), ClientError> {
        Ok(())
    }

    fn read_after_signing(&self, context: &mut RequestContext<'_, I>) -> Result<(), ClientError> {
        Ok(())
    }

    fn modify_before_transmit(
        &self,
        request: Request,
        properties: &mut TypedProperties,
    ) -> Result<Request, ClientError> {
        Ok(request)
    }

    fn read_before_transmit(&self, context: &mut RequestContext<'_, I>) -> Result<(), ClientError> {
        Ok(())
    }

    fn read_after_transmit(&self, context: &mut ResponseContext<'_, I>) -> Result<(), ClientError> {
        Ok(())
    }

    fn modify_before_deserialization(
        &self,
        response: Response,
        properties: &mut TypedProperties,
    ) -> Result<Response, ClientError> {
        Ok(response)
    }

    fn read_before_deserialization(
        &self,
        context: &mut ResponseContext<'_, I>,
    ) -> Result<(), ClientError> {
        Ok(())
    }

    fn read_after_deserialization(
        &self,
        context: &mut OutputContext<'_, I, O>,
    ) -> Result<(), ClientError> {
        Ok(())
    }

    /// Called at the end of each attempt. May replace the outcome, turning
    /// a failure into a success or vice versa.
    fn modify_before_attempt_completion(
        &self,
        response: Result<O, ClientError>,
        properties: &mut TypedProperties,
    ) -> Result<Result<O, ClientError>, ClientError> {
        Ok(response)
    }

    fn read_after_attempt(
        &self,
        context: &mut OutputContext<'_, I, O>,
    ) -> Result<(), ClientError> {
        Ok(())
    }

    /// Called at the end of the execution. May replace the outcome.
    fn modify_before_completion(
        &self,
        response: Result<O, ClientError>,
        properties: &mut TypedProperties,
    ) -> Result<Result<O, ClientError>, ClientError> {
        Ok(response)
    }

    /// Called last. Every interceptor runs this hook even when earlier
    /// ones fail; the last error thrown becomes the terminal response.
    fn read_after_execution(
        &self,
        context: &mut OutputContext<'_, I, O>,
    ) -> Result<(), ClientError> {
        Ok(())
    }
}

/// Composes a sequence of interceptors, invoking each member in order.
pub struct InterceptorChain<I, O> {
    interceptors: Vec<Ref<dyn Interceptor<I, O>>>,
}

impl<I, O> Default for InterceptorChain<I, O> {
    fn default() -> Self {
        InterceptorChain {
            interceptors: Vec::new(),
        }
    }
}

impl<I, O> Clone for InterceptorChain<I, O> {
    fn clone(&self) -> Self {
        InterceptorChain {
            interceptors: self.interceptors.clone(),
        }
    }
}

impl<I, O> InterceptorChain<I, O> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, interceptor: impl Interceptor<I, O> + 'static) -> Self {
        self.interceptors.push(Ref::new(interceptor));
        self
    }

    pub fn push(&mut self, interceptor: Ref<dyn Interceptor<I, O>>) {
        self.interceptors.push(interceptor);
    }

    /// Invoke a read hook on every member, latching the last error.
    ///
    /// Earlier errors are logged and dropped.
    fn latched(
        &self,
        hook_name: &'static str,
        mut hook: impl FnMut(&dyn Interceptor<I, O>) -> Result<(), ClientError>,
    ) -> Result<(), ClientError> {
        let mut latched = None;
        for interceptor in &self.interceptors {
            if let Err(error) = hook(interceptor.as_ref()) {
                if let Some(dropped) = latched.replace(error) {
                    debug!("dropping earlier {hook_name} error: {dropped}");
                }
            }
        }
        match latched {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl<I, O> Interceptor<I, O> for InterceptorChain<I, O>
where
    I: Send + Sync,
    O: Send + Sync,
{
    fn read_before_execution(&self, context: &mut InputContext<'_, I>) -> Result<(), ClientError> {
        self.latched("read_before_execution", |i| {
            i.read_before_execution(context)
        })
    }

    fn modify_before_serialization(
        &self,
        mut request: I,
        properties: &mut TypedProperties,
    ) -> Result<I, ClientError> {
        for interceptor in &self.interceptors {
            request = interceptor.modify_before_serialization(request, properties)?;
        }
        Ok(request)
    }

    fn read_before_serialization(
        &self,
        context: &mut InputContext<'_, I>,
    ) -> Result<(), ClientError> {
        for interceptor in &self.interceptors {
            interceptor.read_before_serialization(context)?;
        }
        Ok(())
    }

    fn read_after_serialization(
        &self,
        context: &mut RequestContext<'_, I>,
    ) -> Result<(), ClientError> {
        for interceptor in &self.interceptors {
            interceptor.read_after_serialization(context)?;
        }
        Ok(())
    }

    fn modify_before_retry_loop(
        &self,
        mut request: Request,
        properties: &mut TypedProperties,
    ) -> Result<Request, ClientError> {
        for interceptor in &self.interceptors {
            request = interceptor.modify_before_retry_loop(request, properties)?;
        }
        Ok(request)
    }

    fn read_before_attempt(&self, context: &mut RequestContext<'_, I>) -> Result<(), ClientError> {
        self.latched("read_before_attempt", |i| i.read_before_attempt(context))
    }

    fn modify_before_signing(
        &self,
        mut request: Request,
        properties: &mut TypedProperties,
    ) -> Result<Request, ClientError> {
        for interceptor in &self.interceptors {
            request = interceptor.modify_before_signing(request, properties)?;
        }
        Ok(request)
    }

    fn read_before_signing(&self, context: &mut RequestContext<'_, I>) -> Result<(), ClientError> {
        for interceptor in &self.interceptors {
            interceptor.read_before_signing(context)?;
        }
        Ok(())
    }

    fn read_after_signing(&self, context: &mut RequestContext<'_, I>) -> Result<(), ClientError> {
        for interceptor in &self.interceptors {
            interceptor.read_after_signing(context)?;
        }
        Ok(())
    }

    fn modify_before_transmit(
        &self,
        mut request: Request,
        properties: &mut TypedProperties,
    ) -> Result<Request, ClientError> {
        for interceptor in &self.interceptors {
            request = interceptor.modify_before_transmit(request, properties)?;
        }
        Ok(request)
    }

    fn read_before_transmit(&self, context: &mut RequestContext<'_, I>) -> Result<(), ClientError> {
        for interceptor in &self.interceptors {
            interceptor.read_before_transmit(context)?;
        }
        Ok(())
    }

    fn read_after_transmit(&self, context: &mut ResponseContext<'_, I>) -> Result<(), ClientError> {
        for interceptor in &self.interceptors {
            interceptor.read_after_transmit(context)?;
        }
        Ok(())
    }

    fn modify_before_deserialization(
        &self,
        mut response: Response,
        properties: &mut TypedProperties,
    ) -> Result<Response, ClientError> {
        for interceptor in &self.interceptors {
            response = interceptor.modify_before_deserialization(response, properties)?;
        }
        Ok(response)
    }

    fn read_before_deserialization(
        &self,
        context: &mut ResponseContext<'_, I>,
    ) -> Result<(), ClientError> {
        for interceptor in &self.interceptors {
            interceptor.read_before_deserialization(context)?;
        }
        Ok(())
    }

    fn read_after_deserialization(
        &self,
        context: &mut OutputContext<'_, I, O>,
    ) -> Result<(), ClientError> {
        for interceptor in &self.interceptors {
            interceptor.read_after_deserialization(context)?;
        }
        Ok(())
    }

    fn modify_before_attempt_completion(
        &self,
        mut response: Result<O, ClientError>,
        properties: &mut TypedProperties,
    ) -> Result<Result<O, ClientError>, ClientError> {
        for interceptor in &self.interceptors {
            response = interceptor.modify_before_attempt_completion(response, properties)?;
        }
        Ok(response)
    }

    fn read_after_attempt(
        &self,
        context: &mut OutputContext<'_, I, O>,
    ) -> Result<(), ClientError> {
        for interceptor in &self.interceptors {
            interceptor.read_after_attempt(context)?;
        }
        Ok(())
    }

    fn modify_before_completion(
        &self,
        mut response: Result<O, ClientError>,
        properties: &mut TypedProperties,
    ) -> Result<Result<O, ClientError>, ClientError> {
        for interceptor in &self.interceptors {
            response = interceptor.modify_before_completion(response, properties)?;
        }
        Ok(response)
    }

    fn read_after_execution(
        &self,
        context: &mut OutputContext<'_, I, O>,
    ) -> Result<(), ClientError> {
        // Every member runs; the last error thrown wins.
        self.latched("read_after_execution", |i| i.read_after_execution(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Recorder {
        calls: Ref<AtomicU32>,
        fail_before_execution: bool,
    }

    impl Interceptor<String, String> for Recorder {
        fn read_before_execution(
            &self,
            _context: &mut InputContext<'_, String>,
        ) -> Result<(), ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_before_execution {
                Err(ClientError::Interceptor("boom".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn read_before_execution_runs_all_members() {
        let calls = Ref::new(AtomicU32::new(0));
        let chain = InterceptorChain::new()
            .with(Recorder {
                calls: calls.clone(),
                fail_before_execution: true,
            })
            .with(Recorder {
                calls: calls.clone(),
                fail_before_execution: false,
            });
        let input = "input".to_string();
        let mut properties = TypedProperties::new();
        let mut context = InputContext {
            request: &input,
            properties: &mut properties,
        };
        // Both interceptors run despite the first one failing.
        assert!(chain.read_before_execution(&mut context).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn modify_hooks_thread_the_value() {
        struct Append(&'static str);
        impl Interceptor<String, String> for Append {
            fn modify_before_serialization(
                &self,
                request: String,
                _properties: &mut TypedProperties,
            ) -> Result<String, ClientError> {
                Ok(request + self.0)
            }
        }
        let chain = InterceptorChain::new().with(Append("-a")).with(Append("-b"));
        let mut properties = TypedProperties::new();
        let result = chain
            .modify_before_serialization("input".to_string(), &mut properties)
            .unwrap();
        assert_eq!(result, "input-a-b");
    }
}
