mod end_to_end_tests;
mod equivalence_tests;
mod concurrency_stress_tests;
