//! Talk list operations and the single-writer controller loop.

use std::sync::Arc;

use client_core::{TalkApi, TalkFeed};
use futures::StreamExt;
use shared::domain::{ClientId, DraftField, Talk, TalkInput};
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use super::{
    events::Transition,
    reducer::{reduce, TalkState},
};

enum ControllerMsg {
    Transition(Transition),
    Submit,
    Shutdown,
}

/// Handle through which operations issue transitions. Once the controller
/// has shut down, dispatching is a logged no-op.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<ControllerMsg>,
}

impl Dispatcher {
    pub fn dispatch(&self, transition: Transition) -> bool {
        let kind = transition.kind();
        match self.tx.send(ControllerMsg::Transition(transition)) {
            Ok(()) => true,
            Err(_) => {
                debug!(kind, "dropping transition after controller shutdown");
                false
            }
        }
    }
}

/// Loads every talk and replaces the local list with the backend's order.
pub async fn fetch_all(api: &dyn TalkApi, dispatcher: &Dispatcher) {
    match api.list_talks().await {
        Ok(talks) => {
            info!(count = talks.len(), "fetched talks");
            dispatcher.dispatch(Transition::Set(talks));
        }
        Err(err) => {
            error!(error = %err, "error fetching talks");
            dispatcher.dispatch(Transition::Error);
        }
    }
}

/// Builds the candidate talk from the draft and the optimistic `Set` that
/// shows it before the backend confirms.
pub fn optimistic_create(state: &TalkState, client_id: &ClientId) -> (Transition, TalkInput) {
    let candidate = Talk {
        name: state.draft.name.clone(),
        description: state.draft.description.clone(),
        speaker_name: state.draft.speaker_name.clone(),
        speaker_bio: state.draft.speaker_bio.clone(),
        client_id: client_id.to_string(),
    };
    let mut talks = state.talks.clone();
    talks.push(candidate.clone());
    (Transition::Set(talks), candidate.into())
}

/// Sends a created talk to the backend. Failures are logged; the optimistic
/// entry stays in the list.
pub async fn submit_talk(api: &dyn TalkApi, input: TalkInput) {
    let name = input.name.clone();
    match api.create_talk(input).await {
        Ok(_) => info!(%name, "item created"),
        Err(err) => error!(%name, error = %err, "error creating talk"),
    }
}

/// Applies feed events one at a time, skipping talks this client created.
pub async fn consume_feed(
    mut feed: TalkFeed,
    client_id: ClientId,
    dispatcher: &Dispatcher,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut stop => break,
            next = feed.next() => match next {
                Some(talk) if talk.is_from(&client_id) => {
                    debug!(name = %talk.name, "ignoring self-echo from feed");
                }
                Some(talk) => {
                    if !dispatcher.dispatch(Transition::Add(talk)) {
                        break;
                    }
                }
                None => {
                    warn!("onCreateTalk feed ended");
                    break;
                }
            }
        }
    }
    feed.unsubscribe().await;
}

async fn run_subscription(
    api: Arc<dyn TalkApi>,
    client_id: ClientId,
    dispatcher: Dispatcher,
    mut stop: oneshot::Receiver<()>,
) {
    let feed = tokio::select! {
        _ = &mut stop => return,
        feed = api.subscribe_on_create_talk() => feed,
    };
    match feed {
        Ok(feed) => consume_feed(feed, client_id, &dispatcher, stop).await,
        Err(err) => error!(error = %err, "failed to subscribe to created talks"),
    }
}

async fn run_event_loop(
    api: Arc<dyn TalkApi>,
    client_id: ClientId,
    mut rx: mpsc::UnboundedReceiver<ControllerMsg>,
    state_tx: watch::Sender<TalkState>,
) {
    let mut state = TalkState::default();
    while let Some(msg) = rx.recv().await {
        match msg {
            ControllerMsg::Transition(transition) => {
                debug!(kind = transition.kind(), "applying transition");
                state = reduce(state, transition);
            }
            ControllerMsg::Submit => {
                let (set, input) = optimistic_create(&state, &client_id);
                state = reduce(state, set);
                let api = Arc::clone(&api);
                tokio::spawn(async move { submit_talk(api.as_ref(), input).await });
            }
            ControllerMsg::Shutdown => break,
        }
        debug!(?state, "state");
        state_tx.send_replace(state.clone());
    }
}

/// Owns the talk list state for one mounted view. Mounting starts the initial
/// fetch and the created-talk subscription; [`TalkController::shutdown`]
/// releases the subscription and stops the loop.
pub struct TalkController {
    client_id: ClientId,
    dispatcher: Dispatcher,
    state: watch::Receiver<TalkState>,
    event_loop: Option<JoinHandle<()>>,
    feed_stop: Option<oneshot::Sender<()>>,
    feed_task: Option<JoinHandle<()>>,
}

impl TalkController {
    pub fn mount(api: Arc<dyn TalkApi>, client_id: ClientId) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(TalkState::default());
        let dispatcher = Dispatcher { tx };

        let event_loop = tokio::spawn(run_event_loop(
            Arc::clone(&api),
            client_id,
            rx,
            state_tx,
        ));

        let (feed_stop, stop_rx) = oneshot::channel();
        let feed_task = tokio::spawn(run_subscription(
            Arc::clone(&api),
            client_id,
            dispatcher.clone(),
            stop_rx,
        ));

        let fetch_dispatcher = dispatcher.clone();
        tokio::spawn(async move { fetch_all(api.as_ref(), &fetch_dispatcher).await });

        info!(%client_id, "talk list mounted");
        Self {
            client_id,
            dispatcher,
            state,
            event_loop: Some(event_loop),
            feed_stop: Some(feed_stop),
            feed_task: Some(feed_task),
        }
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn state(&self) -> TalkState {
        self.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<TalkState> {
        self.state.clone()
    }

    pub fn update_field(&self, field: DraftField, value: impl Into<String>) {
        self.dispatcher.dispatch(Transition::UpdateField {
            field,
            value: value.into(),
        });
    }

    /// Creates a talk from the current draft. The draft is left as is.
    pub fn submit(&self) {
        if self.dispatcher.tx.send(ControllerMsg::Submit).is_err() {
            debug!("dropping submit after controller shutdown");
        }
    }

    pub async fn shutdown(mut self) {
        if let Some(stop) = self.feed_stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.feed_task.take() {
            if let Err(err) = task.await {
                warn!(%err, "subscription task ended abnormally");
            }
        }
        let _ = self.dispatcher.tx.send(ControllerMsg::Shutdown);
        if let Some(task) = self.event_loop.take() {
            if let Err(err) = task.await {
                warn!(%err, "controller loop ended abnormally");
            }
        }
        info!(client_id = %self.client_id, "talk list unmounted");
    }
}

impl Drop for TalkController {
    fn drop(&mut self) {
        if let Some(stop) = self.feed_stop.take() {
            let _ = stop.send(());
        }
        if self.event_loop.is_some() {
            let _ = self.dispatcher.tx.send(ControllerMsg::Shutdown);
        }
    }
}
