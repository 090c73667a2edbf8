//! Scoped access to external resources
//!
//! A `Resource` is anything with a binary active/inactive state that can be
//! probed from outside: a mounted share, an opened LUKS container, a mounted
//! filesystem. `ResourceGuard` gives exclusive scoped access to one:
//!
//! - entering probes first, and if a previous run left the resource active it
//!   is torn down before being brought up again, so we never stack a second
//!   mount on top of the first;
//! - activation is tried exactly once;
//! - teardown always runs, retried per `RetryPolicy`, and a teardown failure
//!   never hides a failure from the guarded body.
//!
//! Guards nest through `Guards::scoped`, which unwinds in reverse order of
//! acquisition whichever level fails.

mod retry;

pub use retry::{RealSleeper, RetryPolicy, Sleeper};

use tracing::{error, info};

use crate::error::{MnemosyneError, MnemosyneResult};

/// Observed state of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Inactive,
    Active,
}

/// An external resource with a probeable on/off state
pub trait Resource {
    /// Human-readable name used in logs and errors
    fn name(&self) -> &str;

    /// Ask the system whether the resource is currently active
    fn probe(&self) -> MnemosyneResult<ResourceState>;

    fn activate(&mut self) -> MnemosyneResult<()>;

    fn deactivate(&mut self) -> MnemosyneResult<()>;
}

/// Holds a resource active until released or dropped
pub struct ResourceGuard<'g, R: Resource> {
    resource: &'g mut R,
    policy: RetryPolicy,
    sleeper: &'g dyn Sleeper,
    armed: bool,
}

impl<'g, R: Resource> ResourceGuard<'g, R> {
    /// Bring `resource` up, recovering it first if a previous run left it
    /// active.
    pub fn enter(
        resource: &'g mut R,
        policy: RetryPolicy,
        sleeper: &'g dyn Sleeper,
    ) -> MnemosyneResult<Self> {
        if resource.probe()? == ResourceState::Active {
            info!("{} already active, deactivating first", resource.name());
            deactivate_with_retry(resource, &policy, sleeper)?;
            info!("{} recovered", resource.name());
        }

        info!("Activating {}...", resource.name());
        resource
            .activate()
            .map_err(|e| MnemosyneError::activation(resource.name(), e))?;

        Ok(Self {
            resource,
            policy,
            sleeper,
            armed: true,
        })
    }

    pub fn resource_mut(&mut self) -> &mut R {
        &mut *self.resource
    }

    /// Tear the resource down now and report how that went
    pub fn release(mut self) -> MnemosyneResult<()> {
        self.armed = false;
        deactivate_with_retry(self.resource, &self.policy, self.sleeper)
    }
}

// Reached only when the body unwinds by panic; `release` disarms otherwise
impl<R: Resource> Drop for ResourceGuard<'_, R> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = deactivate_with_retry(self.resource, &self.policy, self.sleeper) {
                error!("{}", e);
            }
        }
    }
}

fn deactivate_with_retry<R: Resource>(
    resource: &mut R,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
) -> MnemosyneResult<()> {
    let what = format!("Deactivating {}", resource.name());
    info!("{}...", what);
    policy
        .run(sleeper, &what, || resource.deactivate())
        .map_err(|e| MnemosyneError::deactivation(resource.name(), e))?;
    info!("{} deactivated", resource.name());
    Ok(())
}

/// Retry settings shared by every guard in one invocation
#[derive(Clone, Copy)]
pub struct Guards<'s> {
    policy: RetryPolicy,
    sleeper: &'s dyn Sleeper,
}

impl<'s> Guards<'s> {
    pub fn new(policy: RetryPolicy, sleeper: &'s dyn Sleeper) -> Self {
        Self { policy, sleeper }
    }

    /// Deactivate `resource` if it is active, without bringing it up
    pub fn recover<R: Resource>(&self, resource: &mut R) -> MnemosyneResult<()> {
        if resource.probe()? == ResourceState::Active {
            info!("{} left active by an earlier run", resource.name());
            deactivate_with_retry(resource, &self.policy, self.sleeper)?;
        }
        Ok(())
    }

    /// Run `body` with `resource` active, tearing it down afterwards.
    ///
    /// If the body fails and teardown also fails, the body's error is
    /// returned and the teardown error is logged as suppressed.
    pub fn scoped<R, T, F>(&self, resource: &mut R, body: F) -> MnemosyneResult<T>
    where
        R: Resource,
        F: FnOnce(&mut R) -> MnemosyneResult<T>,
    {
        let mut guard = ResourceGuard::enter(resource, self.policy, self.sleeper)?;
        let outcome = body(guard.resource_mut());
        let teardown = guard.release();

        match (outcome, teardown) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(teardown)) => Err(teardown),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(teardown)) => {
                error!("suppressed while handling earlier failure: {}", teardown);
                Err(e)
            }
        }
    }
}
