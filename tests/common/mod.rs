//! Shared fixtures: an in-memory surface, a recording observer and a
//! connector that plays back scripted handshakes on demand.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use nav_trust::{
    AuthChallenge, AuthMethod, ChallengeDisposition, Error, EventKind, LoadError,
    NavigationObserver, NavigationRequest, RenderSurface, ShadowConnection, ShadowConnector,
    ShadowDelegate,
};

/// What a surface did with one navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Load {
    Finished(NavigationRequest),
    Blocked(NavigationRequest),
}

/// A rendering surface that loads instantly.
///
/// `navigate` asks the observer, then delivers `load_started` and
/// `load_finished` if the navigation was allowed.
#[derive(Default)]
pub struct FakeSurface {
    observer: Mutex<Option<Arc<dyn NavigationObserver>>>,
    loads: Mutex<Vec<Load>>,
    ignore_loads: AtomicBool,
    load_requests: Mutex<Vec<NavigationRequest>>,
}

impl FakeSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_observer(observer: Arc<dyn NavigationObserver>) -> Arc<Self> {
        let surface = Self::new();
        surface.set_observer(observer);
        surface
    }

    /// Makes `load_request` record the request without navigating, like a
    /// host that drops programmatic loads.
    pub fn ignore_load_requests(&self) {
        self.ignore_loads.store(true, Ordering::SeqCst);
    }

    pub fn load_requests(&self) -> Vec<NavigationRequest> {
        self.load_requests.lock().unwrap().clone()
    }

    pub fn navigate(&self, request: NavigationRequest) -> bool {
        let observer = self.observer();
        let allowed = observer
            .as_ref()
            .map_or(true, |o| o.should_start_load(&request));
        if allowed {
            if let Some(o) = &observer {
                o.load_started();
                o.load_finished();
            }
            self.loads.lock().unwrap().push(Load::Finished(request));
        } else {
            self.loads.lock().unwrap().push(Load::Blocked(request));
        }
        allowed
    }

    pub fn fail(&self, error: &LoadError) {
        if let Some(o) = self.observer() {
            o.load_failed(error);
        }
    }

    pub fn loads(&self) -> Vec<Load> {
        self.loads.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<NavigationRequest> {
        self.loads()
            .into_iter()
            .filter_map(|load| match load {
                Load::Finished(request) => Some(request),
                Load::Blocked(_) => None,
            })
            .collect()
    }
}

impl RenderSurface for FakeSurface {
    fn observer(&self) -> Option<Arc<dyn NavigationObserver>> {
        self.observer.lock().unwrap().clone()
    }

    fn set_observer(&self, observer: Arc<dyn NavigationObserver>) {
        *self.observer.lock().unwrap() = Some(observer);
    }

    fn load_request(&self, request: NavigationRequest) {
        self.load_requests.lock().unwrap().push(request.clone());
        if !self.ignore_loads.load(Ordering::SeqCst) {
            self.navigate(request);
        }
    }
}

/// One event as seen by a [`Recorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seen {
    ShouldStartLoad(NavigationRequest),
    LoadStarted,
    LoadFinished,
    LoadFailed(LoadError),
}

/// Observer that records what it is given and answers a fixed opinion.
pub struct Recorder {
    handled: HashSet<EventKind>,
    opinion: bool,
    seen: Mutex<Vec<Seen>>,
}

impl Recorder {
    pub fn new(opinion: bool) -> Arc<Self> {
        Self::handling(&EventKind::ALL, opinion)
    }

    pub fn handling(kinds: &[EventKind], opinion: bool) -> Arc<Self> {
        Arc::new(Self {
            handled: kinds.iter().copied().collect(),
            opinion,
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    fn push(&self, seen: Seen) {
        self.seen.lock().unwrap().push(seen);
    }
}

impl NavigationObserver for Recorder {
    fn handles(&self, kind: EventKind) -> bool {
        self.handled.contains(&kind)
    }

    fn should_start_load(&self, request: &NavigationRequest) -> bool {
        self.push(Seen::ShouldStartLoad(request.clone()));
        self.opinion
    }

    fn load_started(&self) {
        self.push(Seen::LoadStarted);
    }

    fn load_finished(&self) {
        self.push(Seen::LoadFinished);
    }

    fn load_failed(&self, error: &LoadError) {
        self.push(Seen::LoadFailed(error.clone()));
    }
}

/// How a scripted server answers a shadow connection.
#[derive(Debug, Clone)]
pub enum Script {
    /// Presents this chain in a server-trust challenge
    ServerTrust(Vec<Vec<u8>>),
    /// Issues a challenge of another method, then responds
    Challenge(AuthMethod),
    /// Responds without any challenge
    Respond,
    /// The connection fails
    Fail,
}

#[derive(Debug, Default)]
pub struct FakeConnection {
    cancelled: AtomicBool,
}

impl ShadowConnection for FakeConnection {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

struct Opened {
    request: NavigationRequest,
    delegate: Arc<dyn ShadowDelegate>,
    connection: Arc<FakeConnection>,
}

/// Connector whose connections only make progress when `run` is called.
pub struct ScriptedConnector {
    script: Script,
    queue: Mutex<Vec<Opened>>,
    opened: Mutex<Vec<(NavigationRequest, Arc<FakeConnection>)>>,
    dispositions: Mutex<Vec<ChallengeDisposition>>,
}

impl ScriptedConnector {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            queue: Mutex::new(Vec::new()),
            opened: Mutex::new(Vec::new()),
            dispositions: Mutex::new(Vec::new()),
        })
    }

    pub fn accepting_chain() -> Vec<Vec<u8>> {
        vec![b"leaf".to_vec(), b"intermediate".to_vec(), b"root".to_vec()]
    }

    /// Plays back every connection opened so far.
    pub fn run(&self) {
        let queued = std::mem::take(&mut *self.queue.lock().unwrap());
        for opened in queued {
            self.play(opened);
        }
    }

    pub fn opened(&self) -> Vec<NavigationRequest> {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .map(|(request, _)| request.clone())
            .collect()
    }

    pub fn connections(&self) -> Vec<Arc<FakeConnection>> {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .map(|(_, connection)| connection.clone())
            .collect()
    }

    pub fn dispositions(&self) -> Vec<ChallengeDisposition> {
        self.dispositions.lock().unwrap().clone()
    }

    fn challenge(&self, opened: &Opened, challenge: AuthChallenge) -> ChallengeDisposition {
        let disposition = opened
            .delegate
            .on_challenge(opened.connection.as_ref(), &challenge);
        self.dispositions.lock().unwrap().push(disposition);
        disposition
    }

    fn play(&self, opened: Opened) {
        let host = opened.request.host().unwrap_or_default().to_string();
        let port = opened.request.port().unwrap_or(443);
        let proceed = match &self.script {
            Script::ServerTrust(chain) => {
                let challenge = AuthChallenge::server_trust(host, port, chain.clone());
                self.challenge(&opened, challenge) != ChallengeDisposition::Cancel
            }
            Script::Challenge(method) => {
                let challenge = AuthChallenge::other(host, port, *method);
                self.challenge(&opened, challenge) != ChallengeDisposition::Cancel
            }
            Script::Respond => true,
            Script::Fail => {
                opened.delegate.on_failure(
                    opened.connection.as_ref(),
                    &Error::Handshake("scripted failure".to_string()),
                );
                false
            }
        };
        if proceed && !opened.connection.is_cancelled() {
            opened.delegate.on_response(opened.connection.as_ref());
        }
    }
}

impl ShadowConnector for ScriptedConnector {
    fn open(
        &self,
        request: &NavigationRequest,
        delegate: Arc<dyn ShadowDelegate>,
    ) -> Result<(), Error> {
        let connection = Arc::new(FakeConnection::default());
        self.opened
            .lock()
            .unwrap()
            .push((request.clone(), connection.clone()));
        self.queue.lock().unwrap().push(Opened {
            request: request.clone(),
            delegate,
            connection,
        });
        Ok(())
    }
}

/// Routes log output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn request(url: &str) -> NavigationRequest {
    NavigationRequest::parse(url).unwrap()
}
