mod test_robots;
