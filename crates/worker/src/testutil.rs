//! Test doubles shared by the worker test modules.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use intercache_client::Network;
use intercache_core::{Error, Request, Response};

/// Scripted network: every URL answers with a fixed response or a fixed
/// transport failure until rescripted. Unscripted URLs fail.
#[derive(Default)]
pub struct FakeNetwork {
    script: Mutex<HashMap<String, Result<Response, String>>>,
    log: Mutex<Vec<String>>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a response for a URL. Replaces any previous script.
    pub fn respond(&self, url: &str, response: Response) {
        self.script
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(response));
    }

    /// Script a transport failure for a URL.
    pub fn fail(&self, url: &str) {
        self.script
            .lock()
            .unwrap()
            .insert(url.to_string(), Err(format!("connection refused: {url}")));
    }

    /// How many times a URL has been fetched.
    pub fn fetch_count(&self, url: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|u| u.as_str() == url).count()
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.log.lock().unwrap().push(request.url.to_string());
        match self.script.lock().unwrap().get(request.url.as_str()) {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(message)) => Err(Error::Network(message.clone())),
            None => Err(Error::Network(format!("unscripted url: {}", request.url))),
        }
    }
}

/// Records lifecycle control signals.
#[derive(Debug, Default)]
pub struct RecordingHost {
    skip_waiting_calls: AtomicUsize,
    claim_clients_calls: AtomicUsize,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_waiting_calls(&self) -> usize {
        self.skip_waiting_calls.load(Ordering::SeqCst)
    }

    pub fn claim_clients_calls(&self) -> usize {
        self.claim_clients_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl crate::host::HostControl for RecordingHost {
    async fn skip_waiting(&self) -> Result<(), Error> {
        self.skip_waiting_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), Error> {
        self.claim_clients_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
