use std::str::FromStr;

use super::Config;

/// Parse `key` into `target`, warning and keeping the old value when it does not parse.
fn override_parsed<T: FromStr>(key: &str, target: &mut T) {
    if let Ok(v) = std::env::var(key) {
        match v.trim().parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => tracing::warn!("ignoring invalid {key} value: {v}"),
        }
    }
}

/// Replace `target` with a non-blank value of `key`.
fn override_string(key: &str, target: &mut String) {
    if let Ok(v) = std::env::var(key)
        && !v.trim().is_empty()
    {
        *target = v.trim().to_owned();
    }
}

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        override_string("OPENAI_MODEL", &mut self.llm.model);
        override_string("RULEBOOK_LLM_BASE_URL", &mut self.llm.base_url);
        override_string("RULEBOOK_EMBEDDING_MODEL", &mut self.llm.embedding_model);
        override_parsed("RULEBOOK_LLM_TIMEOUT", &mut self.llm.timeout_secs);
        override_parsed("RULEBOOK_LLM_MAX_RETRIES", &mut self.llm.max_retries);

        override_string("RULEBOOK_DOCUMENT_PATH", &mut self.document.path);

        override_parsed("RULEBOOK_CHUNK_SIZE", &mut self.index.chunk_size);
        override_parsed("RULEBOOK_CHUNK_OVERLAP", &mut self.index.chunk_overlap);
        override_parsed("RULEBOOK_TOP_K", &mut self.index.top_k);
        override_parsed("RULEBOOK_EMBED_BATCH_SIZE", &mut self.index.embed_batch_size);
        override_parsed("RULEBOOK_WARM_UP", &mut self.index.warm_up);

        override_string("RULEBOOK_BIND", &mut self.gateway.bind);
        override_parsed("PORT", &mut self.gateway.port);
        override_parsed("RULEBOOK_MAX_BODY_SIZE", &mut self.gateway.max_body_size);
    }
}
