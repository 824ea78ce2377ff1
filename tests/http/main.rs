
mod accessors;
mod live;
mod reader;
