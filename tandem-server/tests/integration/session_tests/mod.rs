mod test_run_loop;
