// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
//! Proxy that holds the model credential and performs task breakdowns on
//! behalf of board clients.
pub mod handlers;
pub mod routes;
