mod test_counter_twist_basic;
mod test_falloff_basic;
mod test_node_basic;
mod test_track_basic;
