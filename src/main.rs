fn main() -> anyhow::Result<()> {
    stagewise::run()
}
