pub mod commons_server;
