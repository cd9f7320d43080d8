// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
//! Task board core: persistence, the task repository, AI sub-task
//! suggestions and the controller that ties them together.
pub mod controller;
pub mod error;
pub mod repository;
pub mod settings;
pub mod store;
pub mod suggestions;

pub use controller::{BoardController, BreakdownState, BreakdownTarget, Command, Dialog, Outcome};
pub use error::{BoardError, SuggestionError};
pub use repository::TaskRepository;
pub use settings::{Settings, SuggestionMode};
pub use store::{FileBackend, MemoryBackend, PersistentStore, SlotBackend, TASKS_KEY};
pub use suggestions::{DirectClient, ProxyClient, Suggester, SuggestionClient};
