//! Event routing.
//!
//! Bindings are checked in registration order and the first matching
//! predicate wins; anything left over goes to the fallback. Handler errors
//! stop here and become a single error reply in the originating chat.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use teloxide::types::ChatId;

use super::events::{InboundEvent, OutboundResponse, Request};
use super::transport::{ChatTransport, StatusKind, TransportError};
use crate::error::{user_message, BotError};

pub type HandlerResult = Result<OutboundResponse, BotError>;

type Predicate = Arc<dyn Fn(&InboundEvent) -> bool + Send + Sync>;
type HandlerFn<S> = Arc<dyn Fn(Arc<S>, Request) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// A handler and the status shown while it runs.
struct Action<S> {
    handler: HandlerFn<S>,
    pre_action: Option<StatusKind>,
}

impl<S: 'static> Action<S> {
    fn new<H, Fut>(handler: H, pre_action: Option<StatusKind>) -> Self
    where
        H: Fn(Arc<S>, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            handler: Arc::new(move |state, req| handler(state, req).boxed()),
            pre_action,
        }
    }
}

pub struct HandlerBinding<S> {
    predicate: Predicate,
    action: Action<S>,
}

/// Which binding handled an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Binding(usize),
    Fallback,
}

pub struct Router<S> {
    bindings: Vec<HandlerBinding<S>>,
    fallback: Action<S>,
}

impl<S: Send + Sync + 'static> Router<S> {
    pub fn new<H, Fut>(fallback: H, pre_action: Option<StatusKind>) -> Self
    where
        H: Fn(Arc<S>, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            bindings: Vec::new(),
            fallback: Action::new(fallback, pre_action),
        }
    }

    pub fn register<P, H, Fut>(&mut self, predicate: P, handler: H, pre_action: Option<StatusKind>) -> &mut Self
    where
        P: Fn(&InboundEvent) -> bool + Send + Sync + 'static,
        H: Fn(Arc<S>, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.bindings.push(HandlerBinding {
            predicate: Arc::new(predicate),
            action: Action::new(handler, pre_action),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn select(&self, event: &InboundEvent) -> Route {
        self.bindings
            .iter()
            .position(|b| (b.predicate)(event))
            .map_or(Route::Fallback, Route::Binding)
    }

    /// Run the one handler `request` selects and deliver its response. Never
    /// fails: handler and delivery errors are logged and reported in the chat.
    pub async fn route(&self, state: Arc<S>, transport: &dyn ChatTransport, request: Request) -> Route {
        let route = self.select(&request.event);
        let action = match route {
            Route::Binding(i) => &self.bindings[i].action,
            Route::Fallback => &self.fallback,
        };
        let chat_id = request.chat_id;
        tracing::info!("{} event in chat {} -> {:?}", request.event.kind(), chat_id.0, route);

        if let Some(kind) = action.pre_action {
            if let Err(e) = transport.send_status(chat_id, kind).await {
                tracing::warn!("Failed to send {:?} status to chat {}: {}", kind, chat_id.0, e);
            }
        }

        let response = match (action.handler)(state, request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Handler failed in chat {}: {:?}", chat_id.0, e);
                OutboundResponse::Error(user_message(&e))
            }
        };

        if let Err(e) = deliver(transport, chat_id, &response).await {
            tracing::error!("Failed to deliver reply to chat {}: {}", chat_id.0, e);
            if !matches!(response, OutboundResponse::Error(_)) {
                let fallback = user_message(&BotError::from(e));
                if let Err(e) = transport.send_text(chat_id, &fallback).await {
                    tracing::error!("Failed to report delivery error to chat {}: {}", chat_id.0, e);
                }
            }
        }

        route
    }
}

async fn deliver(
    transport: &dyn ChatTransport,
    chat_id: ChatId,
    response: &OutboundResponse,
) -> Result<(), TransportError> {
    match response {
        OutboundResponse::Text(text) | OutboundResponse::Error(text) => {
            transport.send_text(chat_id, text).await
        }
        OutboundResponse::Photo(url) => transport.send_photo(chat_id, url).await,
        OutboundResponse::Voice { audio, transcript } => {
            transport.send_text(chat_id, transcript).await?;
            transport.send_voice(chat_id, audio).await
        }
    }
}

pub fn is_text(event: &InboundEvent) -> bool {
    matches!(event, InboundEvent::Text(_))
}

pub fn is_voice(event: &InboundEvent) -> bool {
    matches!(event, InboundEvent::Voice(_))
}

pub fn is_photo(event: &InboundEvent) -> bool {
    matches!(event, InboundEvent::Photo(_))
}

pub fn is_command(name: &'static str) -> impl Fn(&InboundEvent) -> bool + Send + Sync + 'static {
    move |event| matches!(event, InboundEvent::Command { name: n, .. } if n == name)
}
