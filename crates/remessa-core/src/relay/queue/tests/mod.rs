mod ack_nack;
mod common;
