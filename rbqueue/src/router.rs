use futures::future::BoxFuture;
use std::collections::HashMap;

use crate::{
    error::SessionError,
    protocol::Message,
};

pub type Handler<C> = for<'a> fn(&'a mut C, &'a Message) -> BoxFuture<'a, Result<(), SessionError>>;

/// A context a router can dispatch into; it must be able to queue a
/// response for the peer.
pub trait Responder {
    fn respond(&mut self, message: Message);
}

/// Maps exact message names to the handlers bound to them.
///
/// Names registered on a router with a prefix are joined with a `.`, so
/// `next` on a `tasks` router is reached through `tasks.next`.
pub struct MessageRouter<C> {
    prefix: Option<String>,
    routes: HashMap<String, Vec<Handler<C>>>,
}

impl<C: Responder + Send> Default for MessageRouter<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Responder + Send> MessageRouter<C> {
    pub fn new() -> Self {
        Self {
            prefix: None,
            routes: HashMap::new(),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            routes: HashMap::new(),
        }
    }

    fn route_name(&self, name: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}.{name}"),
            None => name.to_string(),
        }
    }

    /// Bind a handler; handlers bound to the same name run in the order
    /// they were registered.
    pub fn register(mut self, name: &str, handler: Handler<C>) -> Self {
        let name = self.route_name(name);
        log::trace!("registering route {name}");
        self.routes.entry(name)
            .or_default()
            .push(handler);
        self
    }

    /// Merge the routes of another router into this one.
    pub fn include(mut self, other: MessageRouter<C>) -> Self {
        for (name, handlers) in other.routes.into_iter() {
            self.routes.entry(name)
                .or_default()
                .extend(handlers);
        }
        self
    }

    pub fn routes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.routes.keys().cloned().collect();
        names.sort();
        names
    }

    /// Run every handler bound to the message name, in order.  Returns
    /// whether the message was routed; an unknown message is answered
    /// with the unregistered message envelope.
    pub async fn serve(
        &self,
        ctx: &mut C,
        message: &Message,
    ) -> Result<bool, SessionError> {
        match self.routes.get(&message.message) {
            Some(handlers) => {
                for handler in handlers.iter() {
                    handler(&mut *ctx, message).await?;
                }
                Ok(true)
            }
            None => {
                log::debug!("unregistered message `{}`", message.message);
                ctx.respond(Message::unregistered());
                Ok(false)
            }
        }
    }
}
