pub mod codex_sync;
