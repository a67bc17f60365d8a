//! Serving strategies, one per [`RouteClass`].

pub mod app_shell;
pub mod cache_first;
pub mod network_first;
pub mod offline;

use std::sync::Arc;

use futures_util::FutureExt;
use swcache_core::{Error, Request, Response};

use crate::context::WorkerContext;
use crate::events::{Extender, ResponseFuture};
use crate::policy::Fallback;
use crate::router::RouteClass;

pub use app_shell::app_shell;
pub use cache_first::cache_first;
pub use network_first::network_first;

/// Response future serving `request` with the strategy for `route`.
pub fn serve(route: RouteClass, ctx: Arc<WorkerContext>, request: Request, extender: Extender) -> ResponseFuture {
    match route {
        RouteClass::AppShell => app_shell(ctx, request, extender).boxed(),
        RouteClass::StaticAsset => cache_first(ctx, request, extender).boxed(),
        RouteClass::NetworkFirst => network_first(ctx, request).boxed(),
    }
}

/// Answer for `request` once its network fetch has failed, per `fallback`.
pub async fn recover(ctx: &WorkerContext, fallback: Fallback, request: &Request) -> Result<Response, Error> {
    match fallback {
        Fallback::CachedShell => match ctx.lookup(ctx.shell()).await {
            Some(shell) => Ok(shell),
            None => offline::shell_unavailable(ctx, &request.url),
        },
        Fallback::DataFile => match ctx.lookup(ctx.data_file()).await {
            Some(data) => Ok(data),
            None => offline::asset_unavailable(ctx, &request.url),
        },
        Fallback::CacheMatch => ctx
            .lookup(request)
            .await
            .ok_or_else(|| Error::NoResponse(request.url.clone())),
        Fallback::Miss => Err(Error::NoResponse(request.url.clone())),
    }
}
