fn main() -> anyhow::Result<()> {
    ring_predict_lib::run()
}
