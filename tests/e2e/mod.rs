// End-to-end integration tests for the Narrator Backend API
//
// Each test gets its own in-process server bound to an ephemeral port, backed
// by a fresh NarrationService. The TTS provider is a scripted in-memory fake,
// so no network or credentials are needed.
//
// The fake holds every generation behind a gate that tests can close to keep
// a batch in flight while they issue lifecycle requests.

mod helpers;
mod test_chunks;
mod test_health;
