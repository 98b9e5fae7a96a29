// Copyright 2025 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Web console backend: session handling, the tenant reverse proxy and the
//! REST surface used by the operator UI.

pub mod admin;
pub mod cluster;
pub mod config;
pub mod error;
pub mod handlers;
pub mod idp;
pub mod login;
pub mod marketplace;
pub mod middleware;
pub mod models;
pub mod proxy;
pub mod report;
pub mod routes;
pub mod server;
pub mod session;
pub mod state;
pub mod subnet;
