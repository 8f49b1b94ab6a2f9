mod manager;
mod update;
