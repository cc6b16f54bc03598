use anyhow::bail;
use capgrid_gen::{shape_one, shape_three, shape_two, shape_zero};

pub fn run(shape: u8, count: usize) -> anyhow::Result<()> {
    let nodes = match shape {
        0 => shape_zero(count),
        1 => shape_one(count),
        2 => shape_two(count, 2),
        3 => shape_three(count, 2),
        other => bail!("unknown shape {other}; expected 0-3"),
    };

    print!("{}", serde_yaml::to_string(&nodes)?);
    Ok(())
}
