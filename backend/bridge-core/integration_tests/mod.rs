mod bridge_tests;
mod ws_tests;
