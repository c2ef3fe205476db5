//! Common test utilities and helpers for gensync tests
#![allow(dead_code)]

use assert_fs::prelude::*;
use assert_fs::TempDir;
use async_trait::async_trait;
use gensync::{Config, FetchError, GeneratedFile, GeneratorSource};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Scratch project directory holding a config file and the target tree
pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn root(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }

    pub fn create_config(&self, content: &str) -> PathBuf {
        let config = self.temp_dir.child(".gensync.yml");
        config.write_str(content).expect("Failed to write test config");
        config.path().to_path_buf()
    }

    pub fn load_config(&self, content: &str) -> Config {
        let path = self.create_config(content);
        Config::load(&path).expect("Failed to load test config")
    }
}

/// Canned response for one generator
#[derive(Debug, Clone)]
pub enum Canned {
    Files(Vec<GeneratedFile>),
    NotFound,
    ServerError,
}

/// In-memory code-generation service keyed by generator name
#[derive(Clone, Default)]
pub struct StaticSource {
    responses: Arc<Mutex<HashMap<String, Canned>>>,
    calls: Arc<AtomicUsize>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, generator: &str, response: Canned) -> Self {
        self.set(generator, response);
        self
    }

    pub fn set(&self, generator: &str, response: Canned) {
        self.responses
            .lock()
            .unwrap()
            .insert(generator.to_string(), response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeneratorSource for StaticSource {
    async fn fetch_generated_files(
        &self,
        org: &str,
        app: &str,
        version: &str,
        generator: &str,
    ) -> Result<Vec<GeneratedFile>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let response = self.responses.lock().unwrap().get(generator).cloned();
        match response {
            Some(Canned::Files(files)) => Ok(files),
            Some(Canned::ServerError) => Err(FetchError::Status {
                status: 500,
                url: format!("memory://{}/{}/{}/{}", org, app, version, generator),
                body: "internal error".to_string(),
            }),
            Some(Canned::NotFound) | None => Err(FetchError::NotFound {
                org: org.to_string(),
                app: app.to_string(),
                version: version.to_string(),
                generator: generator.to_string(),
            }),
        }
    }
}

/// Assertion helper for status output
pub fn assert_contains_all(text: &str, expected: &[&str]) {
    for item in expected {
        assert!(
            text.contains(item),
            "Expected text to contain '{}', but it didn't. Text: {}",
            item,
            text
        );
    }
}
