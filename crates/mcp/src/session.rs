use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::Serialize;
use taskmark_core::filter::{FetchTicket, FilterChange, PageOutcome, TaskFilterState};
use taskmark_core::model::{FilterSelection, ResolvedTask, TaskPage};
use taskmark_core::services::TasksService;
use tokio::sync::{mpsc, oneshot};

use crate::tools::util::with_service;

/// What a caller sees after the session settles on a page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub generation: u64,
    pub selection: FilterSelection,
    pub summary: Option<String>,
    pub tasks: Vec<ResolvedTask>,
    pub loaded_pages: u32,
    pub has_more: bool,
    pub outcome: Option<PageOutcome>,
}

type Reply = oneshot::Sender<Result<Listing>>;

enum SessionCommand {
    Apply {
        changes: Vec<FilterChange>,
        reply: Reply,
    },
    Replace {
        selection: FilterSelection,
        reply: Reply,
    },
    Refresh {
        reply: Reply,
    },
    NextPage {
        reply: Reply,
    },
    Snapshot {
        reply: Reply,
    },
    Loaded {
        ticket: FetchTicket,
        result: Result<TaskPage>,
    },
}

/// Handle to the task owning the list's [`TaskFilterState`].
///
/// Every mutation and every fetch result goes through one queue, so the
/// state is only touched in arrival order and a page fetched for an older
/// selection can never overwrite a newer one.
#[derive(Clone)]
pub struct ListSession {
    tx: mpsc::UnboundedSender<SessionCommand>,
}

impl ListSession {
    pub fn spawn(service: Arc<TasksService>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = SessionActor {
            state: TaskFilterState::new(service.page_size()),
            service,
            loopback: tx.downgrade(),
            waiting: Vec::new(),
        };
        tokio::spawn(actor.run(rx));
        Self { tx }
    }

    /// Apply filter changes in order and wait for the first page of the
    /// resulting selection.
    pub async fn apply(&self, changes: Vec<FilterChange>) -> Result<Listing> {
        self.request(|reply| SessionCommand::Apply { changes, reply })
            .await
    }

    /// Swap in a whole selection at once; facets it leaves unset are cleared.
    pub async fn replace(&self, selection: FilterSelection) -> Result<Listing> {
        self.request(|reply| SessionCommand::Replace { selection, reply })
            .await
    }

    pub async fn reset(&self) -> Result<Listing> {
        self.replace(FilterSelection::default()).await
    }

    pub async fn refresh(&self) -> Result<Listing> {
        self.request(|reply| SessionCommand::Refresh { reply }).await
    }

    /// Load the page after the last one received. Answers immediately with
    /// `outcome: None` when nothing was requested.
    pub async fn next_page(&self) -> Result<Listing> {
        self.request(|reply| SessionCommand::NextPage { reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<Listing> {
        self.request(|reply| SessionCommand::Snapshot { reply })
            .await
    }

    async fn request<F>(&self, build: F) -> Result<Listing>
    where
        F: FnOnce(Reply) -> SessionCommand,
    {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .map_err(|_| anyhow!("list session closed"))?;
        rx.await.map_err(|_| anyhow!("list session dropped the request"))?
    }
}

struct SessionActor {
    state: TaskFilterState,
    service: Arc<TasksService>,
    loopback: mpsc::WeakUnboundedSender<SessionCommand>,
    waiting: Vec<Reply>,
}

impl SessionActor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SessionCommand>) {
        while let Some(command) = rx.recv().await {
            self.handle(command);
        }
        tracing::debug!("list session stopped");
    }

    fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Apply { changes, reply } => {
                let ticket = match changes.split_last() {
                    Some((last, earlier)) => {
                        for change in earlier {
                            self.state.apply(*change);
                        }
                        self.state.apply(*last)
                    }
                    None => self.state.refresh(),
                };
                self.waiting.push(reply);
                self.fetch(ticket);
            }
            SessionCommand::Replace { selection, reply } => {
                let ticket = self.state.replace(selection);
                self.waiting.push(reply);
                self.fetch(ticket);
            }
            SessionCommand::Refresh { reply } => {
                let ticket = self.state.refresh();
                self.waiting.push(reply);
                self.fetch(ticket);
            }
            SessionCommand::NextPage { reply } => match self.state.next_page() {
                Some(ticket) => {
                    self.waiting.push(reply);
                    self.fetch(ticket);
                }
                None => {
                    let _ = reply.send(Ok(self.listing(None)));
                }
            },
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(Ok(self.listing(None)));
            }
            SessionCommand::Loaded { ticket, result } => self.loaded(ticket, result),
        }
    }

    fn fetch(&self, ticket: FetchTicket) {
        tracing::debug!(
            generation = ticket.generation,
            page = ticket.query.page,
            "fetching task page"
        );
        let service = self.service.clone();
        let loopback = self.loopback.clone();
        tokio::spawn(async move {
            let query = ticket.query.clone();
            let result = with_service(service, move |service| service.fetch_page(&query)).await;
            if let Some(tx) = loopback.upgrade() {
                let _ = tx.send(SessionCommand::Loaded { ticket, result });
            }
        });
    }

    fn loaded(&mut self, ticket: FetchTicket, result: Result<TaskPage>) {
        match result {
            Ok(page) => {
                let outcome = self.state.receive(&ticket, page);
                if outcome == PageOutcome::Discarded {
                    return;
                }
                let listing = self.listing(Some(outcome));
                for reply in self.waiting.drain(..) {
                    let _ = reply.send(Ok(listing.clone()));
                }
            }
            Err(err) => {
                if ticket.generation != self.state.generation() {
                    tracing::debug!(error = %err, "ignoring failure of superseded fetch");
                    return;
                }
                tracing::warn!(error = %err, page = ticket.query.page, "task page fetch failed");
                self.state.fail(&ticket);
                let message = err.to_string();
                for reply in self.waiting.drain(..) {
                    let _ = reply.send(Err(anyhow!("failed to load tasks: {}", message)));
                }
            }
        }
    }

    fn listing(&self, outcome: Option<PageOutcome>) -> Listing {
        Listing {
            generation: self.state.generation(),
            selection: self.state.selection().clone(),
            summary: self.state.summary(),
            tasks: self.service.resolve_all(self.state.tasks()),
            loaded_pages: self.state.loaded_pages(),
            has_more: self.state.has_more(),
            outcome,
        }
    }
}
