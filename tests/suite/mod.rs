mod coaching;
mod gateway;
mod persistence;
mod timer;
