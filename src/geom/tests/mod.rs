mod test_curve_basic;
mod test_parameterization_basic;
