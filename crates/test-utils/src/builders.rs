#![allow(dead_code)]

use cmdbridge::types::{CommandRequest, EnvPair};

/// Builder for `CommandRequest` to simplify test setup.
pub struct CommandRequestBuilder {
    request: CommandRequest,
}

impl CommandRequestBuilder {
    pub fn new(command: &str) -> Self {
        Self {
            request: CommandRequest {
                command: command.to_string(),
                working_directory: String::new(),
                log_file_path: String::new(),
                environments: vec![],
            },
        }
    }

    pub fn workdir(mut self, dir: &str) -> Self {
        self.request.working_directory = dir.to_string();
        self
    }

    pub fn log_channel(mut self, path: &str) -> Self {
        self.request.log_file_path = path.to_string();
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.request.environments.push(EnvPair::new(key, value));
        self
    }

    pub fn build(self) -> CommandRequest {
        self.request
    }
}
