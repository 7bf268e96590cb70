pub mod poll_url;
