mod algebra;
mod collision;
mod persistence;
mod tracked;
mod update_kinds;
