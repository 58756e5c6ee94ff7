use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use super::save_changes::SaveChangesArgs;
use crate::host::request::RequestContext;

/// Decides whether a caller may submit a reorder batch. An `Err` is treated
/// the same as `Ok(false)`.
#[async_trait]
pub trait AccessPredicate: Send + Sync {
    async fn allow(&self, ctx: &RequestContext, args: &SaveChangesArgs) -> anyhow::Result<bool>;
}

/// Default predicate: any authenticated caller.
pub struct Authenticated;

#[async_trait]
impl AccessPredicate for Authenticated {
    async fn allow(&self, ctx: &RequestContext, _args: &SaveChangesArgs) -> anyhow::Result<bool> {
        Ok(ctx.is_authenticated())
    }
}

/// Anyone, authenticated or not.
pub struct Public;

#[async_trait]
impl AccessPredicate for Public {
    async fn allow(&self, _ctx: &RequestContext, _args: &SaveChangesArgs) -> anyhow::Result<bool> {
        Ok(true)
    }
}

/// Only the listed user ids.
pub struct AllowUsers(pub BTreeSet<String>);

#[async_trait]
impl AccessPredicate for AllowUsers {
    async fn allow(&self, ctx: &RequestContext, _args: &SaveChangesArgs) -> anyhow::Result<bool> {
        Ok(ctx
            .user
            .as_ref()
            .is_some_and(|user| self.0.contains(&user.id)))
    }
}

/// Adapter for synchronous closures.
pub struct FnAccess<F>(F);

#[async_trait]
impl<F> AccessPredicate for FnAccess<F>
where
    F: Fn(&RequestContext, &SaveChangesArgs) -> bool + Send + Sync,
{
    async fn allow(&self, ctx: &RequestContext, args: &SaveChangesArgs) -> anyhow::Result<bool> {
        Ok((self.0)(ctx, args))
    }
}

pub fn access_fn<F>(f: F) -> Arc<dyn AccessPredicate>
where
    F: Fn(&RequestContext, &SaveChangesArgs) -> bool + Send + Sync + 'static,
{
    Arc::new(FnAccess(f))
}

pub fn default_access() -> Arc<dyn AccessPredicate> {
    Arc::new(Authenticated)
}
