mod case_sync_tests;

// This file organizes the integration tests into a cohesive test suite.
// Each module tests a specific aspect of the subsystem:
// - smoke_tests: Configuration basics and component lifecycle
// - token_lifecycle: Token slot ownership and expiry behavior
// - auth_flow: Implicit-grant authorization round trips
// - calendar_client_http: The calendar actor against a mock HTTP provider
// - case_sync_tests: Case-to-event synchronization and its recursion guard
