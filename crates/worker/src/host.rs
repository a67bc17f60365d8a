//! Stdio host for a [`Worker`].
//!
//! Reads one JSON command per line, drives the worker through its lifecycle
//! and answers every command with one JSON reply line. Lifecycle commands are
//! applied in order. Fetch commands run as independent tasks, so replies may
//! arrive out of order and a fetch's background work never holds up the next
//! command. Every in-flight fetch is settled before [`WorkerHost::run`]
//! returns.


use serde::{Deserialize, Serialize};
use swcache_core::{Error, Request, Response, ResponseSource};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};

use crate::context::WorkerContext;
use crate::error::HostError;
use crate::events::{Completion, Directive, Event, EventKind};
use crate::handler::Worker;
use crate::router::RouteClass;

/// Lifecycle position of the hosted worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl WorkerState {
    /// Only an activated worker sees fetch events.
    pub fn can_intercept_fetch(self) -> bool {
        self == WorkerState::Activated
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HostCommand {
    Install,
    Activate,
    Fetch { request: Request },
}

/// One reply line.
#[derive(Debug, Serialize)]
pub struct HostReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EventKind>,
    pub ok: bool,
    pub state: WorkerState,
    pub claimed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intercepted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ResponseSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reports: Vec<Completion>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<Directive>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HostReply {
    fn new(event: Option<EventKind>, state: WorkerState, claimed: bool) -> Self {
        Self {
            event,
            ok: true,
            state,
            claimed,
            intercepted: None,
            route: None,
            status: None,
            source: None,
            content_type: None,
            body_bytes: None,
            reports: Vec::new(),
            directives: Vec::new(),
            error_code: None,
            error: None,
        }
    }

    fn failed(mut self, err: &Error) -> Self {
        self.ok = false;
        self.error_code = Some(err.code());
        self.error = Some(err.to_string());
        self
    }

    fn fetched(mut self, result: Result<Response, Error>) -> Self {
        match result {
            Ok(response) => {
                self.status = Some(response.status);
                self.source = Some(response.source);
                self.content_type = response.content_type().map(str::to_string);
                self.body_bytes = Some(response.body_len());
                self
            }
            Err(err) => self.failed(&err),
        }
    }
}

type ReplySender = mpsc::UnboundedSender<HostReply>;

enum Step {
    Line(std::io::Result<Option<String>>),
    Reply(HostReply),
    Finished(Result<(), JoinError>),
}

pub struct WorkerHost {
    worker: Worker,
    state: WorkerState,
    claimed: bool,
}

impl WorkerHost {
    pub fn new(worker: Worker) -> Self {
        Self { worker, state: WorkerState::Parsed, claimed: false }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Whether the worker has claimed open clients.
    pub fn claimed(&self) -> bool {
        self.claimed
    }

    /// Serve commands from `reader` until it is exhausted and every fetch
    /// has settled.
    pub async fn run<R, W>(&mut self, reader: R, mut writer: W) -> Result<(), HostError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let (reply_tx, mut replies) = mpsc::unbounded_channel();
        let mut in_flight = JoinSet::new();
        let mut input_open = true;

        while input_open || !in_flight.is_empty() {
            let step = tokio::select! {
                line = lines.next_line(), if input_open => Step::Line(line),
                Some(reply) = replies.recv() => Step::Reply(reply),
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => Step::Finished(joined),
            };

            match step {
                Step::Line(line) => match line? {
                    Some(line) => self.accept(&line, &reply_tx, &mut in_flight).await,
                    None => {
                        tracing::info!(in_flight = in_flight.len(), "input closed; settling fetch events");
                        input_open = false;
                    }
                },
                Step::Reply(reply) => write_reply(&mut writer, &reply).await?,
                Step::Finished(Err(err)) => tracing::error!(error = %err, "fetch event task did not complete"),
                Step::Finished(Ok(())) => {}
            }
        }

        drop(reply_tx);
        while let Some(reply) = replies.recv().await {
            write_reply(&mut writer, &reply).await?;
        }

        tracing::info!(state = ?self.state, "host stopping");
        Ok(())
    }

    /// Apply one command line. Lifecycle replies are queued before this
    /// returns; fetches are started on `in_flight` and reply on their own.
    async fn accept(&mut self, line: &str, replies: &ReplySender, in_flight: &mut JoinSet<()>) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let reply = match serde_json::from_str::<HostCommand>(line) {
            Ok(HostCommand::Install) => self.install().await,
            Ok(HostCommand::Activate) => self.activate().await,
            Ok(HostCommand::Fetch { request }) => {
                in_flight.spawn(self.fetch(request, replies.clone()));
                return;
            }
            Err(err) => {
                HostReply::new(None, self.state, self.claimed).failed(&Error::InvalidInput(err.to_string()))
            }
        };
        deliver(replies, reply);
    }

    async fn install(&mut self) -> HostReply {
        if !matches!(self.state, WorkerState::Parsed | WorkerState::Redundant) {
            let err = Error::InvalidInput(format!("cannot install a worker that is {:?}", self.state));
            return self.reply(EventKind::Install).failed(&err);
        }

        self.state = WorkerState::Installing;
        let mut reply = self.run_lifecycle(Event::Install, WorkerState::Installed).await;
        if reply.ok && reply.directives.contains(&Directive::SkipWaiting) {
            tracing::info!("skip_waiting requested; activating immediately");
            let activation = self.run_activation().await;
            reply.ok = activation.ok;
            reply.reports.extend(activation.reports);
            reply.directives.extend(activation.directives);
            reply.error_code = activation.error_code;
            reply.error = activation.error;
        }
        reply.state = self.state;
        reply.claimed = self.claimed;
        reply
    }

    async fn activate(&mut self) -> HostReply {
        match self.state {
            WorkerState::Installed => self.run_activation().await,
            WorkerState::Activated => self.reply(EventKind::Activate),
            state => {
                let err = Error::InvalidInput(format!("cannot activate a worker that is {state:?}"));
                self.reply(EventKind::Activate).failed(&err)
            }
        }
    }

    async fn run_activation(&mut self) -> HostReply {
        self.state = WorkerState::Activating;
        let reply = self.run_lifecycle(Event::Activate, WorkerState::Activated).await;
        if reply.ok && reply.directives.contains(&Directive::ClaimClients) {
            self.claimed = true;
        }
        HostReply { claimed: self.claimed, ..reply }
    }

    /// Dispatch a lifecycle event, wait for its work and move to `next`, or
    /// to redundant if the work failed.
    async fn run_lifecycle(&mut self, event: Event, next: WorkerState) -> HostReply {
        let kind = event.kind();
        let settled = self.worker.dispatch(event).settle().await;

        let mut reply = match settled.completion {
            Some(Err(err)) => {
                tracing::error!(event = ?kind, code = err.code(), error = %err, "lifecycle event failed");
                self.state = WorkerState::Redundant;
                self.reply(kind).failed(&err)
            }
            Some(Ok(done)) => {
                self.state = next;
                let mut reply = self.reply(kind);
                reply.reports.push(done);
                reply
            }
            None => {
                self.state = next;
                self.reply(kind)
            }
        };
        reply.directives = settled.directives;
        tracing::info!(event = ?kind, state = ?self.state, "lifecycle event settled");
        reply
    }

    /// Task serving one fetch event. The worker sees it only if activated at
    /// dispatch time; declined or unseen requests go straight to the network.
    fn fetch(&self, request: Request, replies: ReplySender) -> impl Future<Output = ()> + Send + use<> {
        let mut reply = self.reply(EventKind::Fetch);
        let action = self
            .state
            .can_intercept_fetch()
            .then(|| self.worker.dispatch(Event::Fetch(request.clone())));
        let ctx = self.worker.context().clone();

        async move {
            if let Some(mut action) = action
                && let Some(result) = action.respond().await
            {
                reply.intercepted = Some(true);
                reply.route = action.route();
                deliver(&replies, reply.fetched(result));

                let settled = action.settle().await;
                if settled.background_panics > 0 {
                    tracing::warn!(panics = settled.background_panics, "fetch background work failed");
                }
                return;
            }

            reply.intercepted = Some(false);
            deliver(&replies, reply.fetched(passthrough(&ctx, request).await));
        }
    }

    fn reply(&self, event: EventKind) -> HostReply {
        HostReply::new(Some(event), self.state, self.claimed)
    }
}

/// Plain network fetch for requests the worker does not handle.
async fn passthrough(ctx: &WorkerContext, request: Request) -> Result<Response, Error> {
    let request = ctx.resolve_request(request)?;
    tracing::debug!("passthrough fetch for {}", request.url);
    ctx.network().fetch(&request).await
}

fn deliver(replies: &ReplySender, reply: HostReply) {
    if replies.send(reply).is_err() {
        tracing::debug!("host stopped; reply dropped");
    }
}

async fn write_reply<W>(writer: &mut W, reply: &HostReply) -> Result<(), HostError>
where
    W: AsyncWrite + Unpin,
{
    let mut out = serde_json::to_vec(reply)?;
    out.push(b'\n');
    writer.write_all(&out).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubFetcher, broken_context, context, context_with, url};
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::BufReader;
    use tokio::sync::Notify;
    use tokio::time::timeout;
    use swcache_core::{AppConfig, CacheStorage, MemoryCacheStorage, RequestMode};

    fn host(cache: &MemoryCacheStorage, network: &Arc<StubFetcher>) -> WorkerHost {
        WorkerHost::new(Worker::new(context(cache, network)))
    }

    async fn session(host: &mut WorkerHost, input: &str) -> Vec<Value> {
        let mut out = Vec::new();
        host.run(input.as_bytes(), &mut out).await.unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_install_activates_and_claims() {
        let cache = MemoryCacheStorage::new();
        let network = Arc::new(StubFetcher::new().with_site());
        let mut host = host(&cache, &network);

        let replies = session(&mut host, "{\"type\":\"install\"}\n").await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["event"], "install");
        assert_eq!(replies[0]["ok"], true);
        assert_eq!(replies[0]["state"], "activated");
        assert_eq!(replies[0]["claimed"], true);
        assert_eq!(replies[0]["directives"], serde_json::json!(["skip_waiting", "claim_clients"]));
        assert_eq!(replies[0]["reports"][0]["kind"], "installed");
        assert_eq!(replies[0]["reports"][1]["kind"], "activated");

        assert_eq!(host.state(), WorkerState::Activated);
        assert_eq!(cache.entry_count("mh-v1").await, 5);
    }

    #[tokio::test]
    async fn test_fetch_before_activation_passes_through() {
        let cache = MemoryCacheStorage::new();
        let network = Arc::new(StubFetcher::new().with_site());
        let mut host = host(&cache, &network);

        let replies = session(&mut host, "{\"type\":\"fetch\",\"request\":{\"url\":\"/phrases.json\"}}\n").await;
        assert_eq!(replies[0]["intercepted"], false);
        assert_eq!(replies[0]["source"], "network");
        assert_eq!(replies[0]["status"], 200);
        assert!(cache.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_navigation_served_from_shell() {
        let cache = MemoryCacheStorage::new();
        let network = Arc::new(StubFetcher::new().with_site());
        network.respond("/settings", 200, "<html>settings</html>");
        let mut host = host(&cache, &network);

        let input = "{\"type\":\"install\"}\n\
                     {\"type\":\"fetch\",\"request\":{\"url\":\"/settings\",\"mode\":\"navigate\"}}\n";
        let replies = session(&mut host, input).await;
        assert_eq!(replies[1]["intercepted"], true);
        assert_eq!(replies[1]["route"], "app_shell");
        assert_eq!(replies[1]["source"], "cache");
        assert_eq!(replies[1]["content_type"], "text/html");

        assert_eq!(network.call_count("/settings"), 1);
        let shell = cache.lookup("mh-v1", &Request::get(url("/index.html"))).await.unwrap().unwrap();
        assert_eq!(&shell.into_body()[..], b"<html>settings</html>");
    }

    #[tokio::test]
    async fn test_failed_fetch_reports_error_code() {
        let cache = MemoryCacheStorage::new();
        let network = Arc::new(StubFetcher::new().with_site());
        let mut host = host(&cache, &network);

        let input = "{\"type\":\"install\"}\n\
                     {\"type\":\"fetch\",\"request\":{\"url\":\"/api/phrases\"}}\n";
        let replies = session(&mut host, input).await;
        assert_eq!(replies[1]["ok"], false);
        assert_eq!(replies[1]["route"], "network_first");
        assert_eq!(replies[1]["error_code"], "NO_RESPONSE");
    }

    #[tokio::test]
    async fn test_invalid_command_does_not_stop_host() {
        let cache = MemoryCacheStorage::new();
        let network = Arc::new(StubFetcher::new().with_site());
        let mut host = host(&cache, &network);

        let replies = session(&mut host, "not json\n\n{\"type\":\"activate\"}\n").await;
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["error_code"], "INVALID_INPUT");
        assert!(replies[0]["error"].as_str().unwrap().starts_with("INVALID_INPUT: "));
        assert!(replies[0].get("event").is_none());
        assert_eq!(replies[1]["ok"], false);
        assert_eq!(replies[1]["state"], "parsed");
        assert_eq!(replies[1]["error_code"], "INVALID_INPUT");
        assert!(replies[1]["error"].as_str().unwrap().contains("Parsed"));
    }

    #[tokio::test]
    async fn test_cached_fetch_answered_while_shell_refresh_pending() {
        let cache = MemoryCacheStorage::new();
        for (path, body) in [("/index.html", "<html>shell</html>"), ("/phrases.json", "[\"hi\"]")] {
            let req = Request::get(url(path));
            cache
                .put("mh-v1", &req, Response::new(200, req.url.clone(), body, ResponseSource::Network))
                .await
                .unwrap();
        }
        let gate = Arc::new(Notify::new());
        let network = Arc::new(StubFetcher::gated(gate.clone()));
        network.respond("/about", 200, "<html>about</html>");
        let mut host = host(&cache, &network);
        host.state = WorkerState::Activated;

        let input = "{\"type\":\"fetch\",\"request\":{\"url\":\"/about\",\"mode\":\"navigate\"}}\n\
                     {\"type\":\"fetch\",\"request\":{\"url\":\"/phrases.json\"}}\n";
        let (output, host_side) = tokio::io::duplex(4096);
        let running = tokio::spawn(async move { host.run(input.as_bytes(), host_side).await });

        let mut lines = BufReader::new(output).lines();
        let mut routes = Vec::new();
        for _ in 0..2 {
            let line = timeout(Duration::from_secs(5), lines.next_line())
                .await
                .expect("reply held behind pending refresh")
                .unwrap()
                .unwrap();
            let reply: Value = serde_json::from_str(&line).unwrap();
            assert_eq!(reply["source"], "cache");
            routes.push(reply["route"].as_str().unwrap().to_string());
        }
        routes.sort();
        assert_eq!(routes, ["app_shell", "static_asset"]);
        assert!(!running.is_finished());

        gate.notify_one();
        running.await.unwrap().unwrap();
        assert_eq!(network.call_count("/about"), 1);
        let shell = cache.lookup("mh-v1", &Request::get(url("/index.html"))).await.unwrap().unwrap();
        assert_eq!(&shell.into_body()[..], b"<html>about</html>");
    }

    #[tokio::test]
    async fn test_install_failure_makes_worker_redundant() {
        let network = Arc::new(StubFetcher::new().with_site());
        let mut host = WorkerHost::new(Worker::new(broken_context(&network)));

        let replies = session(&mut host, "{\"type\":\"install\"}\n").await;
        assert_eq!(replies[0]["ok"], false);
        assert_eq!(replies[0]["state"], "redundant");
        assert_eq!(replies[0]["error_code"], "CACHE_ERROR");
        assert!(!host.claimed());
    }

    #[tokio::test]
    async fn test_version_change_prunes_old_generation() {
        let cache = MemoryCacheStorage::new();
        let network = Arc::new(StubFetcher::new().with_site());
        network.respond("/static/app.js", 200, "v1()");

        let mut v1 = host(&cache, &network);
        let input = "{\"type\":\"install\"}\n\
                     {\"type\":\"fetch\",\"request\":{\"url\":\"/static/app.js\",\"destination\":\"script\"}}\n";
        session(&mut v1, input).await;
        assert_eq!(network.call_count("/static/app.js"), 1);

        let config = AppConfig { cache_version: "mh-v2".into(), ..Default::default() };
        let mut v2 = WorkerHost::new(Worker::new(context_with(&config, &cache, &network)));
        let replies = session(&mut v2, input).await;

        assert_eq!(replies[0]["reports"][1]["deleted"], serde_json::json!(["mh-v1"]));
        assert_eq!(cache.keys().await.unwrap(), vec!["mh-v2"]);
        assert_eq!(replies[1]["source"], "network");
        assert_eq!(network.call_count("/static/app.js"), 2);
    }

    #[test]
    fn test_only_activated_intercepts() {
        assert!(WorkerState::Activated.can_intercept_fetch());
        for state in [WorkerState::Parsed, WorkerState::Installed, WorkerState::Redundant] {
            assert!(!state.can_intercept_fetch());
        }
    }

    #[test]
    fn test_command_parsing() {
        let cmd: HostCommand =
            serde_json::from_str("{\"type\":\"fetch\",\"request\":{\"url\":\"/\",\"mode\":\"navigate\"}}").unwrap();
        let HostCommand::Fetch { request } = cmd else { panic!("expected fetch") };
        assert_eq!(request.mode, RequestMode::Navigate);
    }
}
