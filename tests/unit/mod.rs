// Unit tests for VeloStream components
